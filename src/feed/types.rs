//! Feed, article and refetch log types for feedsync.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FeedSyncError, Result};

/// Title stored for items that arrive without one.
pub const UNTITLED: &str = "Untitled";

/// Maximum length for stored article content.
pub const MAX_CONTENT_LENGTH: usize = 10000;

/// A subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feed {
    /// Feed ID.
    pub id: i64,
    /// Feed URL (unique).
    pub url: String,
    /// Feed title as reported by the feed when it was added.
    pub title: String,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Feed URL.
    pub url: String,
    /// Feed title.
    pub title: String,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
        }
    }
}

/// A stored article.
///
/// `feed_title` is a copy of the owning feed's title taken at ingestion
/// time, not a reference to the feed row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Article ID.
    pub id: i64,
    /// Article title.
    pub title: String,
    /// Link to the original article (unique).
    pub link: String,
    /// Plain-text content snippet.
    pub content: Option<String>,
    /// Title of the feed the article was ingested from.
    pub feed_title: String,
}

/// An article that passed validation and is ready to be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateArticle {
    /// Article title.
    pub title: String,
    /// Link to the original article, the deduplication key.
    pub link: String,
    /// Plain-text content snippet.
    pub content: Option<String>,
    /// Title of the owning feed.
    pub feed_title: String,
}

impl CandidateArticle {
    /// Create a candidate with no content.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        feed_title: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            content: None,
            feed_title: feed_title.into(),
        }
    }

    /// Set the content, truncated to `MAX_CONTENT_LENGTH` characters.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        if content.chars().count() > MAX_CONTENT_LENGTH {
            self.content = Some(content.chars().take(MAX_CONTENT_LENGTH).collect());
        } else {
            self.content = Some(content);
        }
        self
    }

    /// Validate a parsed item into a candidate owned by `feed_title`.
    ///
    /// Items without a usable link are rejected.
    pub fn from_parsed(item: ParsedItem, feed_title: &str) -> Result<Self> {
        Self::build(item.title, item.link, item.summary, feed_title.to_string())
    }

    fn build(
        title: Option<String>,
        link: Option<String>,
        content: Option<String>,
        feed_title: String,
    ) -> Result<Self> {
        let link = link
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| FeedSyncError::Validation("article has no link".to_string()))?;
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());

        let candidate = Self::new(title, link, feed_title);
        Ok(match content {
            Some(content) => candidate.with_content(content),
            None => candidate,
        })
    }
}

impl TryFrom<SnapshotArticle> for CandidateArticle {
    type Error = FeedSyncError;

    fn try_from(article: SnapshotArticle) -> Result<Self> {
        Self::build(
            article.title,
            article.link,
            article.content,
            article.feed_title.unwrap_or_default(),
        )
    }
}

/// Result of ingesting one candidate article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The article was new and has been stored.
    Inserted,
    /// An article with the same link already exists; nothing changed.
    AlreadyPresent,
}

impl IngestOutcome {
    /// Returns true if the article was newly stored.
    pub fn is_inserted(self) -> bool {
        self == IngestOutcome::Inserted
    }
}

/// Status of a refetch log entry.
///
/// `Started` is followed by exactly one of the terminal statuses within
/// the same attempt; entries are never updated after being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefetchStatus {
    Started,
    Success,
    Failure,
}

impl RefetchStatus {
    /// Database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefetchStatus::Started => "started",
            RefetchStatus::Success => "success",
            RefetchStatus::Failure => "failure",
        }
    }
}

impl FromStr for RefetchStatus {
    type Err = FeedSyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "started" => Ok(RefetchStatus::Started),
            "success" => Ok(RefetchStatus::Success),
            "failure" => Ok(RefetchStatus::Failure),
            other => Err(FeedSyncError::Database(format!(
                "unknown refetch status: {other}"
            ))),
        }
    }
}

impl fmt::Display for RefetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the refetch audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct RefetchLogEntry {
    /// Entry ID.
    pub id: i64,
    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
    /// Lifecycle status.
    pub status: RefetchStatus,
    /// Human-readable details (feed URL, error, counts).
    pub details: String,
}

/// Feed data returned by the parsing collaborator.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedFeed {
    /// Feed title, empty if the feed has none.
    pub title: String,
    /// Parsed items in document order.
    pub items: Vec<ParsedItem>,
}

/// An item as returned by the parsing collaborator, not yet validated.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedItem {
    /// Item title.
    pub title: Option<String>,
    /// Link to the original article.
    pub link: Option<String>,
    /// Plain-text summary.
    pub summary: Option<String>,
}

impl ParsedItem {
    /// Create an item with a title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            summary: None,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// An article from a client-side snapshot upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub feed_title: Option<String>,
}

/// A snapshot upload document: `{"articles": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Snapshot {
    pub articles: Vec<SnapshotArticle>,
}
