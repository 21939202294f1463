use std::fs;

use anyhow::Context;
use chrono::Local;
use log::info;

use crate::{
    checkpoint::CheckpointStore,
    config::CrawlConfig,
    controller::{Crawler, SeasonRun},
    crawl_context::CrawlContext,
    error::CrawlResult,
    schedule::{AtTrigger, CronTrigger, Deferral, FutureDateScheduler, Reinvocation, ScheduleStore},
    season::{Continuation, SeasonPolicy, SeasonStore},
    session::{GeckoProvider, SessionProvider},
    sink::{CsvSink, RecordSink},
};

/// What the supervising loop should do after one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The season rolled back; run again against the new season.
    Restart,
    /// The terminal season is complete.
    Finished,
    /// Waiting for a scheduled future run.
    Paused,
    /// Season state could not be moved forward; a later run picks it up.
    Halted,
}

impl RunOutcome {
    pub fn from_season(
        run: SeasonRun,
        ctx: &mut CrawlContext,
        policy: &SeasonPolicy,
        seasons: &SeasonStore,
    ) -> Self {
        match run {
            SeasonRun::Deferred => RunOutcome::Paused,
            SeasonRun::Uncleared => RunOutcome::Halted,
            SeasonRun::Complete => match policy.continue_after(&mut ctx.season, seasons) {
                Continuation::Terminate => RunOutcome::Finished,
                Continuation::Rollover(_) => RunOutcome::Restart,
                Continuation::Halt => RunOutcome::Halted,
            },
        }
    }
}

/// Crawls the context's season and applies the continuation policy.
pub async fn crawl_and_continue<P, K, D>(
    crawler: &mut Crawler<P, K, D>,
    ctx: &mut CrawlContext,
    policy: &SeasonPolicy,
    seasons: &SeasonStore,
) -> CrawlResult<RunOutcome>
where
    P: SessionProvider,
    K: RecordSink,
    D: Deferral,
{
    let run = crawler.crawl_season(ctx).await?;
    Ok(RunOutcome::from_season(run, ctx, policy, seasons))
}

/// One full run against the live site, wired from the config.
pub async fn run_season_job(config: &CrawlConfig) -> anyhow::Result<RunOutcome> {
    fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
    let seasons = SeasonStore::new(config.season_path());
    let checkpoints = CheckpointStore::new(config.checkpoint_path());
    let schedules = ScheduleStore::new(config.schedule_path());
    let mut ctx = CrawlContext::load(config.seed_season, &seasons, &checkpoints, &schedules);

    info!("{}", "=".repeat(50));
    info!("New run for the {} season", ctx.season);
    info!("{}", "=".repeat(50));

    let reinvocation = Reinvocation::current()?;
    let deferral = FutureDateScheduler::new(
        schedules,
        CronTrigger::new(reinvocation.clone()),
        AtTrigger::new(reinvocation),
    );
    let mut crawler = Crawler::new(
        GeckoProvider::new(config),
        CsvSink::new(config.stats_dir()),
        deferral,
        checkpoints,
        config.tuning.clone(),
        config.fixture_url.for_season(ctx.season),
        || Local::now().date_naive(),
    );
    let policy = SeasonPolicy::new(config.terminal_season);
    let outcome = crawl_and_continue(&mut crawler, &mut ctx, &policy, &seasons).await?;
    Ok(outcome)
}
