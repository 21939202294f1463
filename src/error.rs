use crate::page::Role;

/// Why a step of the crawl failed.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("{role:?} did not appear within its wait")]
    NotFound { role: Role },

    #[error("no detail tab opened for fixture {index}")]
    NoDetailTab { index: usize },

    #[error("fixture {index} is not on the reloaded list ({len} fixtures)")]
    FixtureMissing { index: usize, len: usize },

    #[error("unreadable match date: {0:?}")]
    InvalidDate(String),

    #[error("unreadable score: {0:?}")]
    InvalidScore(String),

    #[error("webdriver: {error}: {message}")]
    WebDriver { error: String, message: String },

    #[error("browsing session lost: {0}")]
    Session(#[from] reqwest::Error),

    #[error("no browsing session is open")]
    NoSession,

    #[error("browser could not be started after {attempts} attempts")]
    SessionStart { attempts: u32 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("scheduling failed: {0}")]
    Schedule(String),
}

impl CrawlError {
    /// Fatal errors abort the whole run; everything else is retried by the
    /// attempt loop and eventually demoted to a skip.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::SessionStart { .. })
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;
