//! SQLite implementation of `FeedStore`.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Database, FeedStore};
use crate::feed::repository::{ArticleRepository, FeedRepository, RefetchLogRepository};
use crate::feed::{Article, CandidateArticle, Feed, NewFeed, RefetchLogEntry, RefetchStatus};
use crate::Result;

/// `FeedStore` backed by the repositories over a shared `Database`.
#[derive(Debug, Clone)]
pub struct SqlFeedStore {
    db: Arc<Database>,
}

impl SqlFeedStore {
    /// Create a store over an open database.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeedStore for SqlFeedStore {
    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        FeedRepository::new(self.db.pool()).list_all().await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        FeedRepository::new(self.db.pool()).get_by_url(url).await
    }

    async fn create_feed(&self, feed: &NewFeed) -> Result<Feed> {
        FeedRepository::new(self.db.pool()).create_or_get(feed).await
    }

    async fn delete_feed(&self, url: &str) -> Result<bool> {
        FeedRepository::new(self.db.pool())
            .delete_with_articles(url)
            .await
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        ArticleRepository::new(self.db.pool()).list_all().await
    }

    async fn count_articles_by_feed_title(&self, feed_title: &str) -> Result<i64> {
        ArticleRepository::new(self.db.pool())
            .count_by_feed_title(feed_title)
            .await
    }

    async fn find_article_by_link(&self, link: &str) -> Result<bool> {
        ArticleRepository::new(self.db.pool())
            .exists_by_link(link)
            .await
    }

    async fn insert_article_if_absent(&self, article: &CandidateArticle) -> Result<bool> {
        ArticleRepository::new(self.db.pool())
            .insert_if_absent(article)
            .await
    }

    async fn append_refetch_log(&self, status: RefetchStatus, details: &str) -> Result<()> {
        RefetchLogRepository::new(self.db.pool())
            .append(status, details)
            .await?;
        Ok(())
    }

    async fn list_refetch_logs(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>> {
        RefetchLogRepository::new(self.db.pool()).list(filter).await
    }
}
