//! Error types for feedsync.

use thiserror::Error;

/// Common error type for feedsync.
#[derive(Error, Debug)]
pub enum FeedSyncError {
    /// The remote feed could not be reached.
    ///
    /// Covers network failures, non-success HTTP statuses, oversized
    /// bodies, rejected URLs and fetch timeouts.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The feed content could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Database error.
    ///
    /// Errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for caller input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for FeedSyncError {
    fn from(e: sqlx::Error) -> Self {
        FeedSyncError::Database(e.to_string())
    }
}

impl FeedSyncError {
    /// Returns true for errors raised while reaching or reading a remote feed.
    pub fn is_feed_error(&self) -> bool {
        matches!(self, FeedSyncError::Fetch(_) | FeedSyncError::Parse(_))
    }
}

/// Result type alias for feedsync operations.
pub type Result<T> = std::result::Result<T, FeedSyncError>;
