//! Feed service: the operations offered to a request layer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::audit::{self, AuditLog};
use super::executor::RefetchExecutor;
use super::ingest::Ingestor;
use super::orchestrator::RefetchOrchestrator;
use super::parser::FeedParser;
use super::types::{
    Article, CandidateArticle, Feed, NewFeed, ParsedFeed, RefetchLogEntry, SnapshotArticle,
};
use crate::db::FeedStore;
use crate::{FeedSyncError, Result};

/// Result of subscribing to a feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddedFeed {
    /// The stored feed row.
    pub feed: Feed,
    /// Articles stored by the initial ingestion.
    pub new_articles: Vec<CandidateArticle>,
}

/// A feed with its stored article count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDetails {
    pub feed: Feed,
    pub article_count: i64,
}

/// Outcome of a snapshot import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotImport {
    /// Articles newly stored.
    pub inserted: usize,
    /// Articles already present or without a link.
    pub skipped: usize,
}

/// Feed and article operations.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn FeedStore>,
    parser: Arc<dyn FeedParser>,
    executor: RefetchExecutor,
    ingestor: Ingestor,
    audit: AuditLog,
}

impl FeedService {
    /// Create a service; `fetch_timeout` bounds every URL fetch.
    pub fn new(
        store: Arc<dyn FeedStore>,
        parser: Arc<dyn FeedParser>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            executor: RefetchExecutor::new(parser.clone(), store.clone(), fetch_timeout),
            ingestor: Ingestor::new(store.clone()),
            audit: AuditLog::new(store.clone()),
            store,
            parser,
        }
    }

    /// Build an orchestrator sharing this service's store and executor.
    pub fn orchestrator(&self) -> RefetchOrchestrator {
        RefetchOrchestrator::new(self.store.clone(), self.executor.clone())
    }

    /// List all subscribed feeds.
    pub async fn list_feeds(&self) -> Result<Vec<Feed>> {
        self.store.list_feeds().await
    }

    /// Subscribe to a feed and ingest its current items.
    ///
    /// If the URL is already subscribed the existing row is kept and only
    /// unseen items are stored. Writes no refetch log entry.
    pub async fn add_feed(&self, url: &str) -> Result<AddedFeed> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FeedSyncError::Validation("feed URL is required".to_string()));
        }

        let parsed = self.executor.fetch(url).await?;
        let feed = self
            .store
            .create_feed(&NewFeed::new(url, parsed.title))
            .await?;
        let report = self.ingestor.ingest_items(&feed.title, parsed.items).await?;

        info!(
            "Added feed {} ('{}'): {} new articles",
            feed.url,
            feed.title,
            report.new_count()
        );

        Ok(AddedFeed {
            feed,
            new_articles: report.inserted,
        })
    }

    /// Unsubscribe from a feed and delete the articles stored under its title.
    pub async fn delete_feed(&self, url: &str) -> Result<()> {
        if self.store.delete_feed(url).await? {
            info!("Deleted feed {}", url);
            Ok(())
        } else {
            Err(FeedSyncError::NotFound(format!("feed {}", url)))
        }
    }

    /// Get a feed with its article count.
    pub async fn feed_details(&self, url: &str) -> Result<FeedDetails> {
        let feed = self.get_feed(url).await?;
        let article_count = self.store.count_articles_by_feed_title(&feed.title).await?;
        Ok(FeedDetails {
            feed,
            article_count,
        })
    }

    /// Refetch log entries mentioning the feed URL, newest first.
    pub async fn feed_history(&self, url: &str) -> Result<Vec<RefetchLogEntry>> {
        self.audit.history(Some(url)).await
    }

    /// Refetch one feed now, returning the number of new articles.
    pub async fn refetch_feed(&self, url: &str) -> Result<usize> {
        let feed = self.get_feed(url).await?;

        self.audit.started(&audit::manual_started(&feed.url)).await;
        let new_count = self.executor.refetch_one(&feed).await?;
        self.audit
            .success(&audit::manual_succeeded(&feed.url, new_count))
            .await;

        info!("Manually refetched {}: {} new articles", feed.url, new_count);
        Ok(new_count)
    }

    /// List all stored articles.
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        self.store.list_articles().await
    }

    /// Import articles from a client snapshot.
    pub async fn import_snapshot(&self, articles: Vec<SnapshotArticle>) -> Result<SnapshotImport> {
        let mut result = SnapshotImport::default();

        for article in articles {
            let candidate = match CandidateArticle::try_from(article) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!("Skipping snapshot article: {}", e);
                    result.skipped += 1;
                    continue;
                }
            };

            if self.ingestor.ingest(&candidate).await?.is_inserted() {
                result.inserted += 1;
            } else {
                result.skipped += 1;
            }
        }

        info!(
            "Snapshot import: {} inserted, {} skipped",
            result.inserted, result.skipped
        );
        Ok(result)
    }

    /// Fetch and parse a URL without storing anything.
    pub async fn preview_url(&self, url: &str) -> Result<ParsedFeed> {
        self.executor.fetch(url).await
    }

    /// Parse raw feed content without storing anything.
    pub async fn preview_content(&self, raw: &str) -> Result<ParsedFeed> {
        self.parser.parse_from_content(raw).await
    }

    async fn get_feed(&self, url: &str) -> Result<Feed> {
        self.store
            .get_feed_by_url(url)
            .await?
            .ok_or_else(|| FeedSyncError::NotFound(format!("feed {}", url)))
    }
}
