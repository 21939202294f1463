use log::{error, info};
use rand::seq::SliceRandom;
use serde_json::{Value, json};

use crate::{
    config::{CrawlConfig, CrawlTuning},
    error::{CrawlError, CrawlResult},
    page::{PageAdapter, SiteLayout, SitePage},
    webdriver::WebDriverSession,
};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.5; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

/// Hands out fresh browsing sessions.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    type Page: PageAdapter;

    async fn open(&self) -> CrawlResult<Self::Page>;
}

/// Firefox behind a geckodriver endpoint.
pub struct GeckoProvider {
    webdriver_url: String,
    firefox_binary: Option<String>,
    headless: bool,
    layout: SiteLayout,
}

impl GeckoProvider {
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            firefox_binary: config.firefox_binary.clone(),
            headless: config.headless,
            layout: SiteLayout,
        }
    }
}

impl SessionProvider for GeckoProvider {
    type Page = SitePage;

    async fn open(&self) -> CrawlResult<SitePage> {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let capabilities = firefox_capabilities(self.firefox_binary.as_deref(), self.headless, user_agent);
        let session = WebDriverSession::start(&self.webdriver_url, capabilities).await?;
        Ok(SitePage::new(session, self.layout.clone()))
    }
}

pub fn firefox_capabilities(binary: Option<&str>, headless: bool, user_agent: &str) -> Value {
    let mut args = vec!["--width=1920", "--height=1080"];
    if headless {
        args.push("-headless");
    }
    let mut options = json!({
        "args": args,
        "prefs": {
            "dom.webdriver.enabled": false,
            "useAutomationExtension": false,
            "general.useragent.override": user_agent,
            "browser.privatebrowsing.autostart": true,
            "network.cookie.cookieBehavior": 2,
        },
    });
    if let Some(binary) = binary {
        options["binary"] = json!(binary);
    }
    json!({
        "alwaysMatch": {
            "browserName": "firefox",
            "moz:firefoxOptions": options,
        }
    })
}

/// Opens a session, backing off longer after each failed start.
pub async fn open_session<P: SessionProvider>(
    provider: &P,
    tuning: &CrawlTuning,
) -> CrawlResult<P::Page> {
    let attempts = tuning.session_attempts;
    for attempt in 1..=attempts {
        info!("Starting browser (attempt {attempt}/{attempts})...");
        match provider.open().await {
            Ok(page) => return Ok(page),
            Err(e) => {
                error!("Browser failed to start: {e}");
                if attempt < attempts {
                    tuning.recovery_delay.scaled(attempt).pause().await;
                }
            }
        }
    }
    error!("Giving up on the browser after {attempts} attempts");
    Err(CrawlError::SessionStart { attempts })
}
