use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{info, warn};

use crate::{
    record::{MatchRecord, Metric},
    text_manipulators::format_date,
};

const BASE_COLUMNS: [&str; 8] = [
    "date",
    "opponent",
    "venue",
    "ft_goals_for",
    "ht_goals_for",
    "ft_goals_against",
    "ht_goals_against",
    "result",
];

/// Column names of every per-team table, in order.
pub fn header() -> Vec<&'static str> {
    BASE_COLUMNS
        .iter()
        .copied()
        .chain(Metric::ALL.iter().map(|metric| metric.column()))
        .collect()
}

pub fn row(record: &MatchRecord) -> Vec<String> {
    let mut row = vec![
        format_date(record.date),
        record.opponent.clone(),
        record.venue.to_string(),
        record.full_time_goals_for.to_string(),
        record.half_time_goals_for.to_string(),
        record.full_time_goals_against.to_string(),
        record.half_time_goals_against.to_string(),
        record.result.to_string(),
    ];
    row.extend(Metric::ALL.iter().map(|metric| record.metric(*metric).to_string()));
    row
}

/// Where finished fixture sides go.
pub trait RecordSink {
    fn append(&mut self, team: &str, record: &MatchRecord) -> anyhow::Result<()>;
}

/// One CSV file per team under a stats directory.
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn team_path(&self, team: &str) -> PathBuf {
        let file_name: String = team
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
            .collect();
        self.dir.join(format!("{file_name}.csv"))
    }
}

impl RecordSink for CsvSink {
    fn append(&mut self, team: &str, record: &MatchRecord) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        for label in record.unknown_metrics() {
            warn!("Unknown statistic {label:?} for {team}, dropped");
        }
        let path = self.team_path(team);
        write_row(&path, record).with_context(|| format!("failed to append to {}", path.display()))?;
        info!("Saved {} {} vs {} to {}", team, record.venue, record.opponent, path.display());
        Ok(())
    }
}

fn write_row(path: &Path, record: &MatchRecord) -> anyhow::Result<()> {
    let exists = path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::Writer::from_writer(file);
    if !exists {
        writer.write_record(header())?;
    }
    writer.write_record(row(record))?;
    writer.flush()?;
    Ok(())
}
