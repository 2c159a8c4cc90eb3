//! Feed, article and refetch log repositories for feedsync.

use chrono::{DateTime, SecondsFormat, Utc};

use super::types::{Article, CandidateArticle, Feed, NewFeed, RefetchLogEntry, RefetchStatus};
use crate::db::DbPool;
use crate::{FeedSyncError, Result};

/// Row type for a feed.
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    id: i64,
    url: String,
    title: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            id: row.id,
            url: row.url,
            title: row.title,
        }
    }
}

/// Row type for an article.
#[derive(Debug, Clone, sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    link: String,
    content: Option<String>,
    feed_title: String,
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Article {
            id: row.id,
            title: row.title,
            link: row.link,
            content: row.content,
            feed_title: row.feed_title,
        }
    }
}

/// Row type for a refetch log entry.
#[derive(Debug, Clone, sqlx::FromRow)]
struct RefetchLogRow {
    id: i64,
    timestamp: String,
    status: String,
    details: Option<String>,
}

impl TryFrom<RefetchLogRow> for RefetchLogEntry {
    type Error = FeedSyncError;

    fn try_from(row: RefetchLogRow) -> Result<Self> {
        Ok(RefetchLogEntry {
            id: row.id,
            timestamp: parse_datetime(&row.timestamp).ok_or_else(|| {
                FeedSyncError::Database(format!(
                    "invalid refetch log timestamp: {}",
                    row.timestamp
                ))
            })?,
            status: row.status.parse()?,
            details: row.details.unwrap_or_default(),
        })
    }
}

/// Repository for feed operations.
pub struct FeedRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FeedRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a feed, or keep the existing one with the same URL.
    pub async fn create_or_get(&self, feed: &NewFeed) -> Result<Feed> {
        sqlx::query("INSERT INTO feeds (url, title) VALUES ($1, $2) ON CONFLICT(url) DO NOTHING")
            .bind(&feed.url)
            .bind(&feed.title)
            .execute(self.pool)
            .await?;

        self.get_by_url(&feed.url)
            .await?
            .ok_or_else(|| FeedSyncError::NotFound(format!("feed {}", feed.url)))
    }

    /// Get a feed by URL.
    pub async fn get_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let row =
            sqlx::query_as::<_, FeedRow>("SELECT id, url, title FROM feeds WHERE url = $1")
                .bind(url)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Feed::from))
    }

    /// List all feeds (ordered by subscription order).
    pub async fn list_all(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>("SELECT id, url, title FROM feeds ORDER BY id ASC")
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }

    /// Delete a feed and the articles stored under its title.
    ///
    /// Both deletes run in one transaction.
    pub async fn delete_with_articles(&self, url: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let title: Option<String> = sqlx::query_scalar("SELECT title FROM feeds WHERE url = $1")
            .bind(url)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(title) = title else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM articles WHERE feed_title = $1")
            .bind(&title)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM feeds WHERE url = $1")
            .bind(url)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Repository for article operations.
pub struct ArticleRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ArticleRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert an article, ignoring it if the link is already stored.
    ///
    /// Returns true if a row was inserted.
    pub async fn insert_if_absent(&self, article: &CandidateArticle) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO articles (title, link, content, feed_title)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT(link) DO NOTHING
            "#,
        )
        .bind(&article.title)
        .bind(&article.link)
        .bind(&article.content)
        .bind(&article.feed_title)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether an article with this link exists.
    pub async fn exists_by_link(&self, link: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE link = $1)")
                .bind(link)
                .fetch_one(self.pool)
                .await?;
        Ok(exists)
    }

    /// List all articles in ingestion order.
    pub async fn list_all(&self) -> Result<Vec<Article>> {
        let rows = sqlx::query_as::<_, ArticleRow>(
            "SELECT id, title, link, content, feed_title FROM articles ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Article::from).collect())
    }

    /// Count articles stored under a feed title.
    pub async fn count_by_feed_title(&self, feed_title: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE feed_title = $1")
            .bind(feed_title)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Repository for the refetch audit trail.
///
/// Append and read only; entries are never updated or deleted.
pub struct RefetchLogRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> RefetchLogRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Append an entry stamped with the current time.
    pub async fn append(&self, status: RefetchStatus, details: &str) -> Result<i64> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let result =
            sqlx::query("INSERT INTO refetch_logs (timestamp, status, details) VALUES ($1, $2, $3)")
                .bind(timestamp)
                .bind(status.as_str())
                .bind(details)
                .execute(self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// List entries newest first, optionally filtered by a details substring.
    pub async fn list(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>> {
        let rows = match filter {
            Some(needle) => {
                sqlx::query_as::<_, RefetchLogRow>(
                    r#"
                    SELECT id, timestamp, status, details
                    FROM refetch_logs
                    WHERE details LIKE $1 ESCAPE '\'
                    ORDER BY timestamp DESC, id DESC
                    "#,
                )
                .bind(format!("%{}%", escape_like(needle)))
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, RefetchLogRow>(
                    r#"
                    SELECT id, timestamp, status, details
                    FROM refetch_logs
                    ORDER BY timestamp DESC, id DESC
                    "#,
                )
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(RefetchLogEntry::try_from).collect()
    }
}

/// Escape LIKE wildcards so URLs match literally.
fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Parse a stored datetime string.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime('now') format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
