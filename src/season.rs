use std::{fmt, fs, path::PathBuf};

use anyhow::Context;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::Year;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub start: Year,
    pub end: Year,
}

impl SeasonWindow {
    pub fn new(start: Year, end: Year) -> Self {
        Self { start, end }
    }

    pub fn previous(&self) -> Self {
        Self::new(self.start - 1, self.end - 1)
    }
}

impl fmt::Display for SeasonWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// The season currently being crawled, kept as `season.json`.
pub struct SeasonStore {
    path: PathBuf,
}

impl SeasonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<Option<SeasonWindow>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let window = serde_json::from_str(&raw)
            .with_context(|| format!("malformed season file {}", self.path.display()))?;
        Ok(Some(window))
    }

    pub fn save(&self, window: SeasonWindow) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&window)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// The terminal season is done; stop for good.
    Terminate,
    /// The window moved one season back and was persisted; start a fresh run.
    Rollover(SeasonWindow),
    /// The new window could not be persisted. The next run retries.
    Halt,
}

/// Walks the crawl backwards one season at a time until the terminal season.
pub struct SeasonPolicy {
    terminal: SeasonWindow,
}

impl SeasonPolicy {
    pub fn new(terminal: SeasonWindow) -> Self {
        Self { terminal }
    }

    /// Window to crawl after `current`, or `None` once the floor is reached.
    pub fn next(&self, current: SeasonWindow) -> Option<SeasonWindow> {
        if current.start <= self.terminal.start {
            return None;
        }
        Some(current.previous())
    }

    /// Called once the season's checkpoint has been cleared.
    pub fn continue_after(&self, current: &mut SeasonWindow, store: &SeasonStore) -> Continuation {
        let Some(next) = self.next(*current) else {
            info!("Reached the {} season. Stopping.", self.terminal);
            return Continuation::Terminate;
        };
        match store.save(next) {
            Ok(()) => {
                info!("Season updated: {current} -> {next}");
                *current = next;
                Continuation::Rollover(next)
            }
            Err(e) => {
                error!("Could not update the season: {e:#}");
                Continuation::Halt
            }
        }
    }
}
