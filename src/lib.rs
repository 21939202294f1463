pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod crawl_context;
pub mod error;
pub mod fixtures;
pub mod job;
pub mod pacing;
pub mod page;
pub mod record;
pub mod schedule;
pub mod season;
pub mod session;
pub mod sink;
pub mod stats;
pub mod text_manipulators;
pub mod webdriver;

pub use controller::{Crawler, SeasonRun};
pub use crawl_context::CrawlContext;
pub use error::CrawlError;
pub use job::{RunOutcome, run_season_job};

pub type Year = i32;
