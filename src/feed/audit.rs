//! Refetch audit trail.

use std::sync::Arc;

use tracing::error;

use super::types::{RefetchLogEntry, RefetchStatus};
use crate::db::FeedStore;
use crate::Result;

/// Details written when a full run starts.
pub const RUN_STARTED: &str = "Re-fetching all feeds...";

/// Details for a completed full run.
pub fn run_succeeded(new_articles: usize) -> String {
    format!("All feeds re-fetched. {} new articles added.", new_articles)
}

/// Details for a feed that failed to refetch.
pub fn feed_failed(url: &str, message: &str) -> String {
    format!("Error re-fetching feed: {}. Error: {}", url, message)
}

/// Details for a manual single-feed refetch that started.
pub fn manual_started(url: &str) -> String {
    format!("Manually re-fetching feed: {}", url)
}

/// Details for a manual single-feed refetch that succeeded.
pub fn manual_succeeded(url: &str, new_articles: usize) -> String {
    format!("Manually re-fetched feed: {}. {} new articles added.", url, new_articles)
}

/// Append-only writer and reader for refetch log entries.
///
/// Write failures are reported through tracing and swallowed, so a
/// broken audit trail never aborts the refetch it describes.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn FeedStore>,
}

impl AuditLog {
    /// Create an audit log writing through `store`.
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Append a `started` entry.
    pub async fn started(&self, details: &str) {
        self.append(RefetchStatus::Started, details).await;
    }

    /// Append a `success` entry.
    pub async fn success(&self, details: &str) {
        self.append(RefetchStatus::Success, details).await;
    }

    /// Append a `failure` entry.
    pub async fn failure(&self, details: &str) {
        self.append(RefetchStatus::Failure, details).await;
    }

    async fn append(&self, status: RefetchStatus, details: &str) {
        if let Err(e) = self.store.append_refetch_log(status, details).await {
            error!("Failed to write {} refetch log entry '{}': {}", status, details, e);
        }
    }

    /// List entries newest first, optionally only those mentioning `filter`.
    pub async fn history(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>> {
        self.store.list_refetch_logs(filter).await
    }
}
