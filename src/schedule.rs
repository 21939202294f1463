use std::{fmt, fs, path::PathBuf, process::Stdio};

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use log::{error, info, warn};
use tokio::{io::AsyncWriteExt, process::Command};

use crate::{
    error::{CrawlError, CrawlResult},
    text_manipulators::{DATE_FORMAT, format_date},
};

pub const RUN_HOUR: u32 = 23;
pub const RUN_MINUTE: u32 = 30;

/// A deferred run: the fixture date, always at 23:30.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleState {
    pub target_date: NaiveDate,
}

impl fmt::Display for ScheduleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}",
            format_date(self.target_date),
            RUN_HOUR,
            RUN_MINUTE
        )
    }
}

/// `next_run.txt`. Never removed by the crawler: while it exists no new
/// deferral is registered.
pub struct ScheduleStore {
    path: PathBuf,
}

impl ScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> anyhow::Result<Option<ScheduleState>> {
        if !self.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let date = raw.split_whitespace().next().unwrap_or_default();
        let target_date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .with_context(|| format!("malformed schedule {:?}", raw.trim()))?;
        Ok(Some(ScheduleState { target_date }))
    }

    pub fn save(&self, state: &ScheduleState) -> anyhow::Result<()> {
        fs::write(&self.path, state.to_string())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}

/// The command line that brings this crawler back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reinvocation {
    pub dir: PathBuf,
    pub exe: PathBuf,
}

impl Reinvocation {
    pub fn current() -> anyhow::Result<Self> {
        Ok(Self {
            dir: std::env::current_dir().context("no working directory")?,
            exe: std::env::current_exe().context("no executable path")?,
        })
    }

    pub fn shell_line(&self) -> String {
        format!(
            "cd {} && {}",
            shell_quote(&self.dir.to_string_lossy()),
            shell_quote(&self.exe.to_string_lossy())
        )
    }
}

fn shell_quote(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// An OS facility that can run us once at a future date.
#[allow(async_fn_in_trait)]
pub trait TriggerRegistrar {
    fn name(&self) -> &'static str;

    async fn register(&self, date: NaiveDate) -> CrawlResult<()>;
}

pub struct CronTrigger {
    command: Reinvocation,
}

impl CronTrigger {
    pub fn new(command: Reinvocation) -> Self {
        Self { command }
    }

    pub fn cron_line(&self, date: NaiveDate) -> String {
        format!(
            "{RUN_MINUTE} {RUN_HOUR} {} {} * {}",
            date.day(),
            date.month(),
            self.command.shell_line()
        )
    }
}

impl TriggerRegistrar for CronTrigger {
    fn name(&self) -> &'static str {
        "crontab"
    }

    async fn register(&self, date: NaiveDate) -> CrawlResult<()> {
        let line = self.cron_line(date);
        // No crontab yet is a non-zero exit, not an error.
        let listed = Command::new("crontab").arg("-l").output().await?;
        let mut listing = if listed.status.success() {
            String::from_utf8_lossy(&listed.stdout).into_owned()
        } else {
            String::new()
        };
        if listing.lines().any(|existing| existing.trim() == line) {
            info!("crontab already has: {line}");
            return Ok(());
        }
        if !listing.is_empty() && !listing.ends_with('\n') {
            listing.push('\n');
        }
        listing.push_str(&line);
        listing.push('\n');
        pipe_into("crontab", &["-"], &listing).await
    }
}

pub struct AtTrigger {
    command: Reinvocation,
}

impl AtTrigger {
    pub fn new(command: Reinvocation) -> Self {
        Self { command }
    }
}

impl TriggerRegistrar for AtTrigger {
    fn name(&self) -> &'static str {
        "at"
    }

    async fn register(&self, date: NaiveDate) -> CrawlResult<()> {
        let when = format!("{}{:02}{:02}", date.format("%Y%m%d"), RUN_HOUR, RUN_MINUTE);
        pipe_into("at", &["-t", &when], &format!("{}\n", self.command.shell_line())).await
    }
}

async fn pipe_into(program: &str, args: &[&str], input: &str) -> CrawlResult<()> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes()).await?;
    }
    let status = child.wait().await?;
    if !status.success() {
        return Err(CrawlError::Schedule(format!("{program} exited with {status}")));
    }
    Ok(())
}

/// Pauses the crawl until a future fixture date.
#[allow(async_fn_in_trait)]
pub trait Deferral {
    /// `true` only when a new deferral was registered by this call.
    /// `scheduled` is the run this crawl already knows about, if any.
    async fn maybe_defer(&mut self, date: NaiveDate, scheduled: Option<ScheduleState>) -> bool;
}

pub struct FutureDateScheduler<A, B> {
    store: ScheduleStore,
    primary: A,
    fallback: B,
}

impl<A: TriggerRegistrar, B: TriggerRegistrar> FutureDateScheduler<A, B> {
    pub fn new(store: ScheduleStore, primary: A, fallback: B) -> Self {
        Self {
            store,
            primary,
            fallback,
        }
    }

    async fn register(&self, date: NaiveDate) -> Option<&'static str> {
        match self.primary.register(date).await {
            Ok(()) => return Some(self.primary.name()),
            Err(e) => error!("Scheduling with {} failed: {e}", self.primary.name()),
        }
        match self.fallback.register(date).await {
            Ok(()) => Some(self.fallback.name()),
            Err(e) => {
                error!("Scheduling with {} failed: {e}", self.fallback.name());
                None
            }
        }
    }
}

impl<A: TriggerRegistrar, B: TriggerRegistrar> Deferral for FutureDateScheduler<A, B> {
    async fn maybe_defer(&mut self, date: NaiveDate, scheduled: Option<ScheduleState>) -> bool {
        if let Some(existing) = scheduled {
            info!("A run is already scheduled: {existing}");
            return false;
        }
        if self.store.exists() {
            match self.store.load() {
                Ok(Some(existing)) => info!("A run is already scheduled: {existing}"),
                Ok(None) => {}
                Err(e) => warn!("A run is already scheduled ({e:#})"),
            }
            return false;
        }
        let state = ScheduleState { target_date: date };
        let Some(via) = self.register(date).await else {
            return false;
        };
        if let Err(e) = self.store.save(&state) {
            error!("Could not record the scheduled run: {e:#}");
        }
        info!("Next run scheduled for {state} ({via})");
        true
    }
}
