//! Error types for hourcount.

use thiserror::Error;

/// Errors that can occur while computing hours.
#[derive(Error, Debug)]
pub enum HoursError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    #[error("Not a calendar feed: {0}")]
    FeedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl HoursError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        HoursError::FetchFailure {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias for hourcount operations.
pub type HoursResult<T> = Result<T, HoursError>;
