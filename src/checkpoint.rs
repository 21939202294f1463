use std::{fs, io, path::PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use log::info;

use crate::text_manipulators::{DATE_FORMAT, format_date};

/// Next fixture to process and the most recent fixture date seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckpointState {
    pub next_index: usize,
    pub last_date: Option<NaiveDate>,
}

impl CheckpointState {
    pub fn new(next_index: usize, last_date: Option<NaiveDate>) -> Self {
        Self {
            next_index,
            last_date,
        }
    }
}

/// `progress.txt`: the index on the first line, `DD.MM.YYYY` (or nothing) on the second.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<CheckpointState> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(CheckpointState::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        let state = parse(&raw).with_context(|| format!("malformed checkpoint {:?}", raw))?;
        info!(
            "Progress loaded: fixture {}, last date {}",
            state.next_index,
            state.last_date.map(format_date).unwrap_or_else(|| "-".to_string())
        );
        Ok(state)
    }

    /// Writes through a sibling file and a rename, so a crash never leaves half a checkpoint.
    pub fn save(&self, state: &CheckpointState) -> anyhow::Result<()> {
        let date = state.last_date.map(format_date).unwrap_or_default();
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{}\n{}", state.next_index, date))
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", self.path.display())),
        }
    }
}

fn parse(raw: &str) -> anyhow::Result<CheckpointState> {
    let mut lines = raw.lines();
    let next_index = lines
        .next()
        .context("empty checkpoint")?
        .trim()
        .parse()
        .context("bad fixture index")?;
    let last_date = match lines.next().map(str::trim) {
        None | Some("") => None,
        Some(date) => Some(NaiveDate::parse_from_str(date, DATE_FORMAT).context("bad date")?),
    };
    Ok(CheckpointState::new(next_index, last_date))
}
