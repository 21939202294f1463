use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{Year, pacing::DelayRange, season::SeasonWindow};

/// The env vars needed for crawling.
#[derive(Debug, Deserialize)]
pub struct CrawlEnv {
    fixture_url: String,
    #[serde(default = "default_webdriver_url")]
    webdriver_url: String,
    firefox_binary: Option<String>,
    #[serde(default = "default_headless")]
    headless: bool,
    #[serde(default = "default_data_dir")]
    data_dir: PathBuf,
    season_start: Option<Year>,
    season_end: Option<Year>,
    #[serde(default = "default_terminal_start")]
    terminal_season_start: Year,
    #[serde(default = "default_terminal_end")]
    terminal_season_end: Year,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_terminal_start() -> Year {
    2014
}

fn default_terminal_end() -> Year {
    2015
}

pub struct CrawlConfig {
    pub fixture_url: SeasonUrl,
    pub webdriver_url: String,
    pub firefox_binary: Option<String>,
    pub headless: bool,
    pub data_dir: PathBuf,
    /// Window crawled when no season state has been persisted yet.
    pub seed_season: SeasonWindow,
    pub terminal_season: SeasonWindow,
    pub tuning: CrawlTuning,
}

impl CrawlConfig {
    pub fn new() -> anyhow::Result<Self> {
        let env = CrawlEnv::load_from_env()?;
        Self::from_env(env)
    }

    pub fn from_env(env: CrawlEnv) -> anyhow::Result<Self> {
        let fixture_url = SeasonUrlExtractor::new()?.extract(&env.fixture_url)?;
        let seed_season = match (env.season_start, env.season_end) {
            (Some(start), Some(end)) => SeasonWindow::new(start, end),
            (None, None) => fixture_url.season,
            _ => anyhow::bail!("SEASON_START and SEASON_END must be set together"),
        };
        Ok(Self {
            fixture_url,
            webdriver_url: env.webdriver_url,
            firefox_binary: env.firefox_binary,
            headless: env.headless,
            data_dir: env.data_dir,
            seed_season,
            terminal_season: SeasonWindow::new(env.terminal_season_start, env.terminal_season_end),
            tuning: CrawlTuning::default(),
        })
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.data_dir.join("progress.txt")
    }

    pub fn schedule_path(&self) -> PathBuf {
        self.data_dir.join("next_run.txt")
    }

    pub fn season_path(&self) -> PathBuf {
        self.data_dir.join("season.json")
    }

    pub fn stats_dir(&self) -> PathBuf {
        self.data_dir.join("stats")
    }
}

/// Waits, delays and bounds of the crawl loop.
#[derive(Debug, Clone)]
pub struct CrawlTuning {
    pub element_wait: Duration,
    pub tab_wait: Duration,
    pub fixture_delay: DelayRange,
    pub recovery_delay: DelayRange,
    pub max_attempts: u32,
    pub batch_size: usize,
    pub session_attempts: u32,
}

impl Default for CrawlTuning {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_secs(5),
            tab_wait: Duration::from_secs(3),
            fixture_delay: DelayRange::from_secs(1, 3),
            recovery_delay: DelayRange::from_secs(5, 10),
            max_attempts: 5,
            batch_size: 10,
            session_attempts: 5,
        }
    }
}

impl CrawlTuning {
    /// Same bounds, no sleeping.
    pub fn immediate() -> Self {
        Self {
            element_wait: Duration::ZERO,
            tab_wait: Duration::ZERO,
            fixture_delay: DelayRange::ZERO,
            recovery_delay: DelayRange::ZERO,
            ..Self::default()
        }
    }
}

/// A fixture page URL with its season segment cut out, so the same
/// competition can be addressed for any season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonUrl {
    prefix: String,
    suffix: String,
    pub season: SeasonWindow,
}

impl SeasonUrl {
    pub fn for_season(&self, season: SeasonWindow) -> String {
        format!("{}{}-{}{}", self.prefix, season.start, season.end, self.suffix)
    }
}

pub struct SeasonUrlExtractor {
    // Matches the `/2023-2024/` segment of a fixture page url.
    season_extraction_regex: Regex,
}

impl SeasonUrlExtractor {
    pub fn new() -> anyhow::Result<Self> {
        let season_extraction_regex = Regex::new(r"/(\d{4})-(\d{4})/")?;
        Ok(Self {
            season_extraction_regex,
        })
    }

    pub fn extract(&self, fixture_url: &str) -> anyhow::Result<SeasonUrl> {
        let Some(caps) = self.season_extraction_regex.captures(fixture_url) else {
            return Err(anyhow::anyhow!(
                "couldn't find season in provided url: {}",
                fixture_url
            ));
        };
        let (Some(start), Some(end)) = (caps.get(1), caps.get(2)) else {
            return Err(anyhow::anyhow!(
                "couldn't find season in provided url: {}",
                fixture_url
            ));
        };
        let season = SeasonWindow::new(start.as_str().parse()?, end.as_str().parse()?);
        Ok(SeasonUrl {
            prefix: fixture_url[..start.start()].to_string(),
            suffix: fixture_url[end.end()..].to_string(),
            season,
        })
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}

#[cfg(test)]
mod tests {
    use super::*;

    const PREMIER_LEAGUE: &str =
        "https://www.sahadan.com/puan-durumu/ingiltere-premier-lig/2023-2024/fikstur/2kwbbcootiqqgmrzs6o5inle5";

    fn env_from(pairs: &[(&str, &str)]) -> CrawlEnv {
        envy::from_iter(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
            .expect("env should deserialize")
    }

    #[test]
    fn season_url_is_rebuilt_for_other_seasons() {
        let url = SeasonUrlExtractor::new().unwrap().extract(PREMIER_LEAGUE).unwrap();
        assert_eq!(url.season, SeasonWindow::new(2023, 2024));
        assert_eq!(url.for_season(url.season), PREMIER_LEAGUE);
        assert_eq!(
            url.for_season(SeasonWindow::new(2019, 2020)),
            "https://www.sahadan.com/puan-durumu/ingiltere-premier-lig/2019-2020/fikstur/2kwbbcootiqqgmrzs6o5inle5"
        );
    }

    #[test]
    fn url_without_season_is_rejected() {
        let extractor = SeasonUrlExtractor::new().unwrap();
        assert!(
            extractor
                .extract("https://www.sahadan.com/puan-durumu/ingiltere-premier-lig/fikstur/x")
                .is_err()
        );
    }

    #[test]
    fn defaults_fill_in_everything_but_the_url() {
        let config = CrawlConfig::from_env(env_from(&[("FIXTURE_URL", PREMIER_LEAGUE)])).unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(config.headless);
        assert_eq!(config.seed_season, SeasonWindow::new(2023, 2024));
        assert_eq!(config.terminal_season, SeasonWindow::new(2014, 2015));
        assert_eq!(config.checkpoint_path(), PathBuf::from("./progress.txt"));
        assert_eq!(config.tuning.max_attempts, 5);
    }

    #[test]
    fn explicit_seed_season_overrides_the_url() {
        let config = CrawlConfig::from_env(env_from(&[
            ("FIXTURE_URL", PREMIER_LEAGUE),
            ("SEASON_START", "2020"),
            ("SEASON_END", "2021"),
            ("HEADLESS", "false"),
        ]))
        .unwrap();
        assert_eq!(config.seed_season, SeasonWindow::new(2020, 2021));
        assert!(!config.headless);
    }

    #[test]
    fn half_a_seed_season_is_an_error() {
        let env = env_from(&[("FIXTURE_URL", PREMIER_LEAGUE), ("SEASON_START", "2020")]);
        assert!(CrawlConfig::from_env(env).is_err());
    }
}
