//! Store abstraction for feedsync.
//!
//! The refetch engine and the feed service only talk to persistence
//! through `FeedStore`, so they can run against the SQLite store or a
//! test double.

use async_trait::async_trait;

use crate::feed::{Article, CandidateArticle, Feed, NewFeed, RefetchLogEntry, RefetchStatus};
use crate::Result;

/// Logical persistence operations needed by feedsync.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// List all feeds in subscription order.
    async fn list_feeds(&self) -> Result<Vec<Feed>>;

    /// Get a feed by its URL.
    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;

    /// Insert a feed, keeping the existing row if the URL is already known.
    ///
    /// Returns the stored feed either way.
    async fn create_feed(&self, feed: &NewFeed) -> Result<Feed>;

    /// Delete a feed and every article whose `feed_title` equals its title.
    ///
    /// Returns false if no feed has this URL.
    async fn delete_feed(&self, url: &str) -> Result<bool>;

    /// List all stored articles.
    async fn list_articles(&self) -> Result<Vec<Article>>;

    /// Count articles captured under a feed title.
    async fn count_articles_by_feed_title(&self, feed_title: &str) -> Result<i64>;

    /// Check whether an article with this link exists.
    async fn find_article_by_link(&self, link: &str) -> Result<bool>;

    /// Insert an article unless one with the same link exists.
    ///
    /// Must be atomic with respect to concurrent callers. Returns true if
    /// a row was inserted.
    async fn insert_article_if_absent(&self, article: &CandidateArticle) -> Result<bool>;

    /// Append an entry to the refetch audit trail.
    async fn append_refetch_log(&self, status: RefetchStatus, details: &str) -> Result<()>;

    /// List audit entries, newest first, optionally only those whose
    /// details contain `filter`.
    async fn list_refetch_logs(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>>;
}
