#![allow(dead_code)]

use std::{
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::NaiveDate;
use fixture_crawler::{
    CrawlError,
    checkpoint::CheckpointStore,
    config::CrawlTuning,
    controller::{BYE, Crawler},
    error::CrawlResult,
    page::{ElementId, PageAdapter, Role, WindowId},
    record::MatchRecord,
    schedule::{Deferral, ScheduleState},
    session::SessionProvider,
    sink::RecordSink,
};

pub const LIST: &str = "list";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

/// One scripted entry of the fixture list.
#[derive(Debug, Clone)]
pub struct FakeFixture {
    pub home: String,
    pub away: String,
    pub date: String,
    pub home_full_time: String,
    pub away_full_time: String,
    pub half_time: String,
    /// Panel contents by position; `None` never renders.
    pub tabs: Vec<Option<Vec<(String, String, String)>>>,
    /// Clicks that open no detail tab before one finally does.
    pub failures: usize,
    /// Detail roles that never render for this fixture.
    pub missing: Vec<Role>,
}

impl FakeFixture {
    pub fn played(home: &str, away: &str, date: &str, score: (u32, u32), half_time: &str) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            date: date.into(),
            home_full_time: score.0.to_string(),
            away_full_time: score.1.to_string(),
            half_time: half_time.into(),
            tabs: vec![
                Some(vec![stat("Topla Oynama", "%58", "%42")]),
                Some(vec![stat("Toplam Şut", "15", "7"), stat("İsabetli Şut", "6", "2")]),
                Some(vec![stat("Korner", "8", "3")]),
                Some(vec![stat("Faul", "9", "12")]),
                Some(vec![stat("Sarı Kart", "1", "3")]),
            ],
            failures: 0,
            missing: Vec::new(),
        }
    }

    pub fn bye(team: &str) -> Self {
        Self::played(team, BYE, "", (0, 0), "")
    }

    pub fn failing(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn without(mut self, role: Role) -> Self {
        self.missing.push(role);
        self
    }

    pub fn without_tab(mut self, position: usize) -> Self {
        self.tabs[position - 1] = None;
        self
    }
}

pub fn stat(label: &str, home: &str, away: &str) -> (String, String, String) {
    (label.into(), home.into(), away.into())
}

#[derive(Debug, Default)]
pub struct SiteState {
    pub fixtures: Vec<FakeFixture>,
    /// Session starts to refuse before succeeding again.
    pub refused_sessions: usize,
    pub session_requests: usize,
    pub sessions_opened: usize,
    pub sessions_quit: usize,
    pub cookie_clears: usize,
    pub fail_cookies: bool,
    pub list_unavailable: bool,
    pub clicks: Vec<usize>,
    pub visited: Vec<String>,
}

#[derive(Clone)]
pub struct FakeProvider {
    pub state: Arc<Mutex<SiteState>>,
}

impl FakeProvider {
    pub fn new(fixtures: Vec<FakeFixture>) -> Self {
        let clicks = vec![0; fixtures.len()];
        Self {
            state: Arc::new(Mutex::new(SiteState {
                fixtures,
                clicks,
                ..Default::default()
            })),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SiteState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

impl SessionProvider for FakeProvider {
    type Page = FakePage;

    async fn open(&self) -> CrawlResult<FakePage> {
        let mut state = self.state.lock().unwrap();
        state.session_requests += 1;
        if state.refused_sessions > 0 {
            state.refused_sessions -= 1;
            return Err(CrawlError::WebDriver {
                error: "session not created".into(),
                message: "browser binary not found".into(),
            });
        }
        state.sessions_opened += 1;
        Ok(FakePage {
            state: self.state.clone(),
            loaded: false,
            windows: vec![WindowId(LIST.into())],
            focus: WindowId(LIST.into()),
            stats_open: false,
            active_tab: None,
        })
    }
}

pub struct FakePage {
    state: Arc<Mutex<SiteState>>,
    loaded: bool,
    windows: Vec<WindowId>,
    focus: WindowId,
    stats_open: bool,
    active_tab: Option<u8>,
}

impl FakePage {
    fn detail(&self) -> Option<usize> {
        self.focus.0.strip_prefix("detail-")?.parse().ok()
    }

    fn fixture(&self) -> Option<FakeFixture> {
        let index = self.detail()?;
        self.state.lock().unwrap().fixtures.get(index).cloned()
    }

    fn tab_content(&self, position: u8) -> Option<Vec<(String, String, String)>> {
        self.fixture()?.tabs.get(usize::from(position) - 1).cloned().flatten()
    }

    fn missing(role: Role) -> CrawlError {
        CrawlError::NotFound { role }
    }
}

impl PageAdapter for FakePage {
    async fn navigate(&mut self, url: &str) -> CrawlResult<()> {
        self.state.lock().unwrap().visited.push(url.to_string());
        self.loaded = true;
        Ok(())
    }

    async fn locate(&mut self, role: Role, _wait: Duration) -> CrawlResult<ElementId> {
        let id = match role {
            Role::HomeTeam | Role::AwayTeam | Role::MatchDate | Role::HomeFullTime
            | Role::AwayFullTime | Role::HalfTime | Role::StatsButton => {
                let fixture = self.fixture().ok_or(Self::missing(role))?;
                if fixture.missing.contains(&role) {
                    return Err(Self::missing(role));
                }
                format!("{role:?}")
            }
            Role::StatsWidget if self.stats_open => "widget".to_string(),
            Role::StatsTab(position) if self.stats_open => format!("tab-{position}"),
            Role::StatsTable => {
                let position = self.active_tab.ok_or(Self::missing(role))?;
                self.tab_content(position).ok_or(Self::missing(role))?;
                format!("table-{position}")
            }
            _ => return Err(Self::missing(role)),
        };
        Ok(ElementId(id))
    }

    async fn locate_all(&mut self, role: Role, _wait: Duration) -> CrawlResult<Vec<ElementId>> {
        let state = self.state.lock().unwrap();
        if role != Role::FixtureStatus || !self.loaded || state.list_unavailable {
            return Err(Self::missing(role));
        }
        Ok((0..state.fixtures.len())
            .map(|index| ElementId(format!("fixture-{index}")))
            .collect())
    }

    async fn locate_within(&mut self, parent: &ElementId, role: Role) -> CrawlResult<Vec<ElementId>> {
        let Some(position) = parent.0.strip_prefix("table-").and_then(|p| p.parse::<u8>().ok()) else {
            return Ok(Vec::new());
        };
        let rows = self.tab_content(position).unwrap_or_default();
        Ok(match role {
            Role::StatLabel => (0..rows.len())
                .map(|row| ElementId(format!("label-{position}-{row}")))
                .collect(),
            Role::StatValue => (0..rows.len())
                .flat_map(|row| {
                    [
                        ElementId(format!("value-{position}-{row}-home")),
                        ElementId(format!("value-{position}-{row}-away")),
                    ]
                })
                .collect(),
            _ => Vec::new(),
        })
    }

    async fn click(&mut self, element: &ElementId) -> CrawlResult<()> {
        if let Some(index) = element.0.strip_prefix("fixture-").and_then(|i| i.parse::<usize>().ok()) {
            let mut state = self.state.lock().unwrap();
            state.clicks[index] += 1;
            let fixture = &mut state.fixtures[index];
            if fixture.failures > 0 {
                fixture.failures -= 1;
            } else {
                self.windows.push(WindowId(format!("detail-{index}")));
            }
            return Ok(());
        }
        if element.0 == "StatsButton" {
            self.stats_open = true;
        } else if let Some(position) = element.0.strip_prefix("tab-") {
            self.active_tab = position.parse().ok();
        }
        Ok(())
    }

    async fn text(&mut self, element: &ElementId) -> CrawlResult<String> {
        let fixture = self.fixture().ok_or(CrawlError::NoSession)?;
        let text = match element.0.as_str() {
            "HomeTeam" => fixture.home,
            "AwayTeam" => fixture.away,
            "MatchDate" => fixture.date,
            "HomeFullTime" => fixture.home_full_time,
            "AwayFullTime" => fixture.away_full_time,
            "HalfTime" => fixture.half_time,
            other => {
                let parts: Vec<&str> = other.split('-').collect();
                let position: u8 = parts.get(1).and_then(|p| p.parse().ok()).unwrap_or(0);
                let row: usize = parts.get(2).and_then(|r| r.parse().ok()).unwrap_or(0);
                let rows = self.tab_content(position).unwrap_or_default();
                let Some((label, home, away)) = rows.get(row).cloned() else {
                    return Ok(String::new());
                };
                match (parts[0], parts.get(3).copied()) {
                    ("label", _) => label,
                    ("value", Some("home")) => home,
                    ("value", Some("away")) => away,
                    _ => String::new(),
                }
            }
        };
        Ok(text)
    }

    async fn current_window(&mut self) -> CrawlResult<WindowId> {
        Ok(self.focus.clone())
    }

    async fn window_handles(&mut self) -> CrawlResult<Vec<WindowId>> {
        Ok(self.windows.clone())
    }

    async fn switch_to_window(&mut self, window: &WindowId) -> CrawlResult<()> {
        self.focus = window.clone();
        self.stats_open = false;
        self.active_tab = None;
        Ok(())
    }

    async fn close_window(&mut self) -> CrawlResult<()> {
        let focus = self.focus.clone();
        self.windows.retain(|window| *window != focus);
        Ok(())
    }

    async fn delete_cookies(&mut self) -> CrawlResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_cookies {
            return Err(CrawlError::WebDriver {
                error: "unable to set cookie".into(),
                message: "cookie store unavailable".into(),
            });
        }
        state.cookie_clears += 1;
        Ok(())
    }

    async fn quit(self) -> CrawlResult<()> {
        self.state.lock().unwrap().sessions_quit += 1;
        Ok(())
    }
}

/// Keeps every record, and what the progress file said when it arrived.
#[derive(Default)]
pub struct MemorySink {
    pub records: Vec<(String, MatchRecord)>,
    pub progress_file: Option<PathBuf>,
    pub progress_seen: Vec<Option<String>>,
}

impl RecordSink for MemorySink {
    fn append(&mut self, team: &str, record: &MatchRecord) -> anyhow::Result<()> {
        if let Some(path) = &self.progress_file {
            self.progress_seen.push(fs::read_to_string(path).ok());
        }
        self.records.push((team.to_string(), record.clone()));
        Ok(())
    }
}

/// Answers deferral requests from a script and remembers them.
#[derive(Default)]
pub struct ScriptedDeferral {
    pub answers: Vec<bool>,
    pub requests: Vec<NaiveDate>,
}

impl Deferral for ScriptedDeferral {
    async fn maybe_defer(&mut self, date: NaiveDate, _scheduled: Option<ScheduleState>) -> bool {
        self.requests.push(date);
        if self.answers.is_empty() {
            false
        } else {
            self.answers.remove(0)
        }
    }
}

pub type FakeCrawler = Crawler<FakeProvider, MemorySink, ScriptedDeferral>;

pub fn crawler(
    provider: &FakeProvider,
    dir: &std::path::Path,
    deferral: ScriptedDeferral,
) -> FakeCrawler {
    let progress = dir.join("progress.txt");
    let sink = MemorySink {
        progress_file: Some(progress.clone()),
        ..Default::default()
    };
    Crawler::new(
        provider.clone(),
        sink,
        deferral,
        CheckpointStore::new(progress),
        CrawlTuning::immediate(),
        "https://example.test/puan-durumu/lig/2023-2024/fikstur/abc".to_string(),
        today,
    )
}
