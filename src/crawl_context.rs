use log::{error, info};

use crate::{
    checkpoint::{CheckpointState, CheckpointStore},
    schedule::{ScheduleState, ScheduleStore},
    season::{SeasonStore, SeasonWindow},
};

/// Everything a run knows about where it is. Loaded once at start and
/// written back only at the crawler's transition points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlContext {
    pub season: SeasonWindow,
    pub checkpoint: CheckpointState,
    pub schedule: Option<ScheduleState>,
}

impl CrawlContext {
    pub fn load(
        seed_season: SeasonWindow,
        seasons: &SeasonStore,
        checkpoints: &CheckpointStore,
        schedules: &ScheduleStore,
    ) -> Self {
        let season = match seasons.load() {
            Ok(Some(season)) => season,
            Ok(None) => seed_season,
            Err(e) => {
                error!("Could not load the season, using {seed_season}: {e:#}");
                seed_season
            }
        };
        let checkpoint = checkpoints.load().unwrap_or_else(|e| {
            error!("Could not load progress, starting over: {e:#}");
            CheckpointState::default()
        });
        let schedule = schedules.load().unwrap_or_else(|e| {
            error!("Could not read the scheduled run: {e:#}");
            None
        });
        if let Some(schedule) = &schedule {
            info!("Scheduled run on record: {schedule}");
        }
        Self {
            season,
            checkpoint,
            schedule,
        }
    }
}
