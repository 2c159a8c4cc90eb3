//! Single-feed refetch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use super::audit::{self, AuditLog};
use super::ingest::Ingestor;
use super::parser::FeedParser;
use super::types::{Feed, ParsedFeed};
use crate::db::FeedStore;
use crate::{FeedSyncError, Result};

/// Re-pulls one feed and ingests its new items.
#[derive(Clone)]
pub struct RefetchExecutor {
    parser: Arc<dyn FeedParser>,
    ingestor: Ingestor,
    audit: AuditLog,
    fetch_timeout: Duration,
}

impl RefetchExecutor {
    /// Create an executor.
    ///
    /// `fetch_timeout` bounds every URL fetch made through `fetch`.
    pub fn new(
        parser: Arc<dyn FeedParser>,
        store: Arc<dyn FeedStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            parser,
            ingestor: Ingestor::new(store.clone()),
            audit: AuditLog::new(store),
            fetch_timeout,
        }
    }

    /// Fetch and parse `url`, failing with `Fetch` if the timeout elapses.
    pub async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        match tokio::time::timeout(self.fetch_timeout, self.parser.parse_from_url(url)).await {
            Ok(result) => result,
            Err(_) => Err(FeedSyncError::Fetch(format!(
                "timed out after {} ms",
                self.fetch_timeout.as_millis()
            ))),
        }
    }

    /// Refetch one feed, returning the number of newly stored articles.
    ///
    /// On failure a `failure` audit entry naming the feed is written
    /// before the error is returned.
    pub async fn refetch_one(&self, feed: &Feed) -> Result<usize> {
        match self.run(feed).await {
            Ok(new_count) => {
                debug!("Feed {} refetched: {} new articles", feed.url, new_count);
                Ok(new_count)
            }
            Err(e) => {
                if e.is_feed_error() {
                    warn!("Failed to refetch feed {}: {}", feed.url, e);
                } else {
                    error!("Failed to refetch feed {}: {}", feed.url, e);
                }
                self.audit
                    .failure(&audit::feed_failed(&feed.url, &e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&self, feed: &Feed) -> Result<usize> {
        let parsed = self.fetch(&feed.url).await?;
        let report = self.ingestor.ingest_items(&feed.title, parsed.items).await?;
        Ok(report.new_count())
    }
}
