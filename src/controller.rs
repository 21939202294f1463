use chrono::NaiveDate;
use log::{debug, error, info, warn};

use crate::{
    checkpoint::{CheckpointState, CheckpointStore},
    config::CrawlTuning,
    crawl_context::CrawlContext,
    error::{CrawlError, CrawlResult},
    fixtures::{FixtureHandle, list_fixtures},
    page::{PageAdapter, Role, WindowId},
    pacing::DelayRange,
    record::{MatchRecord, Scoreline, StatLine},
    schedule::{Deferral, ScheduleState},
    session::{SessionProvider, open_session},
    sink::RecordSink,
    stats::collect_stats,
    text_manipulators::{extract_match_date, format_date},
};

/// Team name the site shows for the idle side of a bye week.
pub const BYE: &str = "BAY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonRun {
    /// Every fixture was processed and the checkpoint is gone.
    Complete,
    /// Every fixture was processed but the checkpoint could not be removed.
    Uncleared,
    /// A future fixture was reached and a later run was scheduled.
    Deferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixtureOutcome {
    Done,
    Deferred,
}

enum Attempt {
    Emitted { date: NaiveDate },
    Bye,
    Deferred,
}

enum Detail {
    Played {
        home: String,
        away: String,
        date: NaiveDate,
        score: Scoreline,
        stats: Vec<StatLine>,
    },
    Bye,
    Deferred,
}

/// The open session and the fixture handles resolved on it.
struct Browser<G> {
    page: Option<G>,
    fixtures: Vec<FixtureHandle>,
    total: usize,
    healthy: bool,
}

impl<G: PageAdapter> Browser<G> {
    fn new() -> Self {
        Self {
            page: None,
            fixtures: Vec::new(),
            total: 0,
            healthy: false,
        }
    }

    fn install(&mut self, fixtures: Vec<FixtureHandle>) {
        if self.total != 0 && fixtures.len() != self.total {
            warn!(
                "Fixture list changed size after reload: {} -> {}",
                self.total,
                fixtures.len()
            );
        }
        self.total = fixtures.len();
        self.fixtures = fixtures;
        self.healthy = true;
    }

    async fn discard(&mut self) {
        self.fixtures.clear();
        self.healthy = false;
        if let Some(page) = self.page.take() {
            if let Err(e) = page.quit().await {
                debug!("Closing the old browser failed: {e}");
            }
        }
    }
}

/// Walks one season's fixtures from the checkpoint to the end.
pub struct Crawler<P, K, D> {
    provider: P,
    sink: K,
    deferral: D,
    checkpoints: CheckpointStore,
    tuning: CrawlTuning,
    url: String,
    /// Read at every date gate, so a crawl running past midnight sees the new day.
    clock: fn() -> NaiveDate,
}

impl<P, K, D> Crawler<P, K, D>
where
    P: SessionProvider,
    K: RecordSink,
    D: Deferral,
{
    pub fn new(
        provider: P,
        sink: K,
        deferral: D,
        checkpoints: CheckpointStore,
        tuning: CrawlTuning,
        url: String,
        clock: fn() -> NaiveDate,
    ) -> Self {
        Self {
            provider,
            sink,
            deferral,
            checkpoints,
            tuning,
            url,
            clock,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn crawl_season(&mut self, ctx: &mut CrawlContext) -> CrawlResult<SeasonRun> {
        let mut browser = Browser::new();
        self.first_listing(&mut browser).await?;

        let start = ctx.checkpoint.next_index;
        info!("Continuing from fixture {start} of {}", browser.total);
        let mut index = start;
        while index < browser.total {
            let outcome = match self.process_fixture(&mut browser, index, ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    browser.discard().await;
                    return Err(e);
                }
            };
            if outcome == FixtureOutcome::Deferred {
                info!("Pausing until the scheduled run");
                browser.discard().await;
                return Ok(SeasonRun::Deferred);
            }
            index += 1;
            if (index - start) % self.tuning.batch_size == 0 && index < browser.total {
                if let Err(e) = self.rotate(&mut browser).await {
                    browser.discard().await;
                    return Err(e);
                }
            }
        }
        browser.discard().await;

        match self.checkpoints.clear() {
            Ok(()) => {
                info!("All fixtures done, progress file removed");
                ctx.checkpoint = CheckpointState::default();
                Ok(SeasonRun::Complete)
            }
            Err(e) => {
                error!("Could not remove the progress file: {e:#}");
                Ok(SeasonRun::Uncleared)
            }
        }
    }

    /// The list has to load once before the season's length is known.
    async fn first_listing(&self, browser: &mut Browser<P::Page>) -> CrawlResult<()> {
        let attempts = self.tuning.max_attempts;
        let mut last = CrawlError::NoSession;
        for attempt in 1..=attempts {
            match self.reopen(browser, DelayRange::ZERO).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!("Fixture list did not load: {e} (attempt {attempt}/{attempts})");
                    last = e;
                    self.tuning.recovery_delay.pause().await;
                }
            }
        }
        browser.discard().await;
        Err(last)
    }

    /// Fresh session, list page loaded, handles resolved.
    async fn reopen(&self, browser: &mut Browser<P::Page>, settle: DelayRange) -> CrawlResult<()> {
        browser.discard().await;
        let mut page = open_session(&self.provider, &self.tuning).await?;
        let listed = self.load_list(&mut page, settle).await;
        browser.page = Some(page);
        browser.install(listed?);
        Ok(())
    }

    async fn load_list(&self, page: &mut P::Page, settle: DelayRange) -> CrawlResult<Vec<FixtureHandle>> {
        info!("Visiting {}", self.url);
        page.navigate(&self.url).await?;
        settle.pause().await;
        list_fixtures(page, self.tuning.element_wait).await
    }

    /// Periodic browser restart, whether or not anything failed.
    async fn rotate(&self, browser: &mut Browser<P::Page>) -> CrawlResult<()> {
        info!(
            "{} fixtures done, restarting the browser...",
            self.tuning.batch_size
        );
        self.tuning.recovery_delay.pause().await;
        browser.discard().await;
        self.tuning.recovery_delay.pause().await;
        match self.reopen(browser, self.tuning.fixture_delay).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                error!("Fixture list did not reload: {e}");
                Ok(())
            }
        }
    }

    async fn process_fixture(
        &mut self,
        browser: &mut Browser<P::Page>,
        index: usize,
        ctx: &mut CrawlContext,
    ) -> CrawlResult<FixtureOutcome> {
        let attempts = self.tuning.max_attempts;
        let mut seen_date = None;
        for attempt in 1..=attempts {
            if !browser.healthy {
                info!("Restarting the browser...");
                let settle = self.tuning.recovery_delay;
                if let Err(e) = self.reopen(browser, settle).await {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    error!("Recovery failed for fixture {}: {e} (attempt {attempt}/{attempts})", index + 1);
                    continue;
                }
            }
            info!("Opening fixture {} (attempt {attempt}/{attempts})", index + 1);
            match self.attempt(browser, index, &mut seen_date, ctx.schedule).await {
                Ok(Attempt::Emitted { date }) => {
                    self.advance(ctx, index + 1, Some(date));
                    return Ok(FixtureOutcome::Done);
                }
                Ok(Attempt::Bye) => {
                    let last_date = ctx.checkpoint.last_date;
                    self.advance(ctx, index + 1, last_date);
                    return Ok(FixtureOutcome::Done);
                }
                Ok(Attempt::Deferred) => {
                    ctx.schedule = seen_date.map(|target_date| ScheduleState { target_date });
                    return Ok(FixtureOutcome::Deferred);
                }
                Err(e) => {
                    error!("Fixture {} failed: {e} (attempt {attempt}/{attempts})", index + 1);
                    browser.healthy = false;
                }
            }
        }
        error!("Giving up on fixture {} after {attempts} attempts", index + 1);
        let date = seen_date.or(ctx.checkpoint.last_date);
        self.advance(ctx, index + 1, date);
        Ok(FixtureOutcome::Done)
    }

    /// Moves the checkpoint forward. A failed write is logged and the crawl goes on.
    fn advance(&self, ctx: &mut CrawlContext, next_index: usize, last_date: Option<NaiveDate>) {
        debug_assert!(next_index > ctx.checkpoint.next_index);
        ctx.checkpoint = CheckpointState::new(next_index, last_date);
        match self.checkpoints.save(&ctx.checkpoint) {
            Ok(()) => info!(
                "Progress saved: fixture {next_index}, date {}",
                last_date.map(format_date).unwrap_or_else(|| "-".to_string())
            ),
            Err(e) => error!("Could not save progress: {e:#}"),
        }
    }

    async fn attempt(
        &mut self,
        browser: &mut Browser<P::Page>,
        index: usize,
        seen_date: &mut Option<NaiveDate>,
        scheduled: Option<ScheduleState>,
    ) -> CrawlResult<Attempt> {
        let Some(fixture) = browser.fixtures.get(index).cloned() else {
            return Err(CrawlError::FixtureMissing {
                index,
                len: browser.fixtures.len(),
            });
        };
        let page = browser.page.as_mut().ok_or(CrawlError::NoSession)?;

        self.tuning.fixture_delay.pause().await;
        match page.delete_cookies().await {
            Ok(()) => debug!("Cookies cleared"),
            Err(e) => warn!("Could not clear cookies: {e}"),
        }

        let list_window = page.current_window().await?;
        page.click(&fixture.element).await?;
        let Some(detail_window) = page
            .wait_for_new_window(&list_window, self.tuning.element_wait)
            .await?
        else {
            return Err(CrawlError::NoDetailTab { index });
        };
        page.switch_to_window(&detail_window).await?;

        match self.read_detail(page, seen_date, scheduled).await? {
            Detail::Bye => {
                back_to_list(page, &list_window).await?;
                Ok(Attempt::Bye)
            }
            Detail::Deferred => Ok(Attempt::Deferred),
            Detail::Played {
                home,
                away,
                date,
                score,
                stats,
            } => {
                for (team, record) in MatchRecord::pair(&home, &away, date, &score, &stats) {
                    if let Err(e) = self.sink.append(&team, &record) {
                        error!("Could not save statistics for {team}: {e:#}");
                    }
                }
                // Rows are written; a retry from here would duplicate them.
                if let Err(e) = back_to_list(page, &list_window).await {
                    warn!("Could not return to the fixture list: {e}");
                    browser.healthy = false;
                }
                Ok(Attempt::Emitted { date })
            }
        }
    }

    async fn read_detail(
        &mut self,
        page: &mut P::Page,
        seen_date: &mut Option<NaiveDate>,
        scheduled: Option<ScheduleState>,
    ) -> CrawlResult<Detail> {
        let wait = self.tuning.element_wait;
        let home = page.read_text(Role::HomeTeam, wait).await?;
        let away = page.read_text(Role::AwayTeam, wait).await?;
        if home == BYE || away == BYE {
            info!("Skipping bye: {home} vs {away}");
            return Ok(Detail::Bye);
        }

        let date = extract_match_date(&page.read_text(Role::MatchDate, wait).await?)?;
        *seen_date = Some(date);
        if date > (self.clock)() {
            info!("Future fixture found: {home} vs {away} on {}", format_date(date));
            if self.deferral.maybe_defer(date, scheduled).await {
                return Ok(Detail::Deferred);
            }
        }

        let home_full_time = page.read_text(Role::HomeFullTime, wait).await?;
        let away_full_time = page.read_text(Role::AwayFullTime, wait).await?;
        let half_time = page.read_text(Role::HalfTime, wait).await?;
        let score = Scoreline::from_text(&home_full_time, &away_full_time, &half_time)?;
        info!(
            "{home} {}-{} {away} (HT {}-{}) on {}",
            score.home_full_time,
            score.away_full_time,
            score.home_half_time,
            score.away_half_time,
            format_date(date)
        );

        let stats = collect_stats(page, &self.tuning).await?;
        Ok(Detail::Played {
            home,
            away,
            date,
            score,
            stats,
        })
    }
}

async fn back_to_list<G: PageAdapter>(page: &mut G, list_window: &WindowId) -> CrawlResult<()> {
    page.close_window().await?;
    page.switch_to_window(list_window).await
}
