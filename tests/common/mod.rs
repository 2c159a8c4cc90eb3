//! Test helpers for refetch engine integration tests.
//!
//! Provides a scripted `StubParser`, store wrappers that fail feed
//! listing or selected article inserts, and setup helpers over an
//! in-memory database.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use feedsync::db::{FeedStore, SqlFeedStore};
use feedsync::feed::{
    Article, CandidateArticle, Feed, FeedParser, FeedService, NewFeed, ParsedFeed, ParsedItem,
    RefetchLogEntry, RefetchStatus,
};
use feedsync::{Database, FeedSyncError, Result};

/// Default per-feed fetch timeout for tests.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Scripted response for one URL.
#[derive(Debug, Clone)]
enum Response {
    Feed(ParsedFeed),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Script {
    response: Response,
    delay: Duration,
}

/// Parser returning scripted results per URL and recording every call.
#[derive(Default)]
pub struct StubParser {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl StubParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `title` and `items` for `url`.
    pub fn serve(&self, url: &str, title: &str, items: Vec<ParsedItem>) {
        self.script(
            url,
            Response::Feed(ParsedFeed {
                title: title.to_string(),
                items,
            }),
            Duration::ZERO,
        );
    }

    /// Serve `title` and `items` for `url` after `delay`.
    pub fn serve_slowly(&self, url: &str, title: &str, items: Vec<ParsedItem>, delay: Duration) {
        self.script(
            url,
            Response::Feed(ParsedFeed {
                title: title.to_string(),
                items,
            }),
            delay,
        );
    }

    /// Fail every fetch of `url` with a fetch error.
    pub fn fail(&self, url: &str, message: &str) {
        self.script(url, Response::Fail(message.to_string()), Duration::ZERO);
    }

    fn script(&self, url: &str, response: Response, delay: Duration) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), Script { response, delay });
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Wait until at least `n` fetches have been made.
    pub async fn wait_for_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for parser calls");
    }
}

#[async_trait]
impl FeedParser for StubParser {
    async fn parse_from_url(&self, url: &str) -> Result<ParsedFeed> {
        self.calls.lock().unwrap().push(url.to_string());
        let script = self.scripts.lock().unwrap().get(url).cloned();

        let Some(script) = script else {
            return Err(FeedSyncError::Fetch(format!("no script for {}", url)));
        };
        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        match script.response {
            Response::Feed(feed) => Ok(feed),
            Response::Fail(message) => Err(FeedSyncError::Fetch(message)),
        }
    }

    async fn parse_from_content(&self, raw: &str) -> Result<ParsedFeed> {
        feedsync::feed::parse_feed(raw.as_bytes())
    }
}

/// Store wrapper whose `list_feeds` always fails.
pub struct FailingListStore {
    inner: SqlFeedStore,
}

impl FailingListStore {
    pub fn new(inner: SqlFeedStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl FeedStore for FailingListStore {
    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        Err(FeedSyncError::Database("database is locked".to_string()))
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        self.inner.get_feed_by_url(url).await
    }

    async fn create_feed(&self, feed: &NewFeed) -> Result<Feed> {
        self.inner.create_feed(feed).await
    }

    async fn delete_feed(&self, url: &str) -> Result<bool> {
        self.inner.delete_feed(url).await
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.inner.list_articles().await
    }

    async fn count_articles_by_feed_title(&self, feed_title: &str) -> Result<i64> {
        self.inner.count_articles_by_feed_title(feed_title).await
    }

    async fn find_article_by_link(&self, link: &str) -> Result<bool> {
        self.inner.find_article_by_link(link).await
    }

    async fn insert_article_if_absent(&self, article: &CandidateArticle) -> Result<bool> {
        self.inner.insert_article_if_absent(article).await
    }

    async fn append_refetch_log(&self, status: RefetchStatus, details: &str) -> Result<()> {
        self.inner.append_refetch_log(status, details).await
    }

    async fn list_refetch_logs(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>> {
        self.inner.list_refetch_logs(filter).await
    }
}

/// Store wrapper whose article inserts fail for chosen links.
pub struct FailingInsertStore {
    inner: SqlFeedStore,
    broken_links: Mutex<HashSet<String>>,
}

impl FailingInsertStore {
    pub fn new(inner: SqlFeedStore) -> Self {
        Self {
            inner,
            broken_links: Mutex::new(HashSet::new()),
        }
    }

    /// Make every insert of `link` fail with a database error.
    pub fn break_link(&self, link: &str) {
        self.broken_links.lock().unwrap().insert(link.to_string());
    }
}

#[async_trait]
impl FeedStore for FailingInsertStore {
    async fn list_feeds(&self) -> Result<Vec<Feed>> {
        self.inner.list_feeds().await
    }

    async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        self.inner.get_feed_by_url(url).await
    }

    async fn create_feed(&self, feed: &NewFeed) -> Result<Feed> {
        self.inner.create_feed(feed).await
    }

    async fn delete_feed(&self, url: &str) -> Result<bool> {
        self.inner.delete_feed(url).await
    }

    async fn list_articles(&self) -> Result<Vec<Article>> {
        self.inner.list_articles().await
    }

    async fn count_articles_by_feed_title(&self, feed_title: &str) -> Result<i64> {
        self.inner.count_articles_by_feed_title(feed_title).await
    }

    async fn find_article_by_link(&self, link: &str) -> Result<bool> {
        self.inner.find_article_by_link(link).await
    }

    async fn insert_article_if_absent(&self, article: &CandidateArticle) -> Result<bool> {
        if self.broken_links.lock().unwrap().contains(&article.link) {
            return Err(FeedSyncError::Database("disk I/O error".to_string()));
        }
        self.inner.insert_article_if_absent(article).await
    }

    async fn append_refetch_log(&self, status: RefetchStatus, details: &str) -> Result<()> {
        self.inner.append_refetch_log(status, details).await
    }

    async fn list_refetch_logs(&self, filter: Option<&str>) -> Result<Vec<RefetchLogEntry>> {
        self.inner.list_refetch_logs(filter).await
    }
}

/// In-memory SQLite store.
pub async fn setup_store() -> SqlFeedStore {
    let db = Database::open_in_memory().await.unwrap();
    SqlFeedStore::new(Arc::new(db))
}

/// Store, stub parser and service wired together.
pub struct TestEnv {
    pub store: Arc<dyn FeedStore>,
    pub parser: Arc<StubParser>,
    pub service: FeedService,
}

pub async fn setup() -> TestEnv {
    setup_with_timeout(FETCH_TIMEOUT).await
}

pub async fn setup_with_timeout(fetch_timeout: Duration) -> TestEnv {
    let store: Arc<dyn FeedStore> = Arc::new(setup_store().await);
    let parser = Arc::new(StubParser::new());
    let service = FeedService::new(store.clone(), parser.clone(), fetch_timeout);
    TestEnv {
        store,
        parser,
        service,
    }
}

/// Build `n` items with links `{base}/{i}`.
pub fn items(base: &str, n: usize) -> Vec<ParsedItem> {
    (1..=n)
        .map(|i| ParsedItem::new(format!("Item {}", i), format!("{}/{}", base, i)))
        .collect()
}

/// Store a feed row directly, without fetching.
pub async fn subscribe(env: &TestEnv, url: &str, title: &str) -> Feed {
    env.store
        .create_feed(&NewFeed::new(url, title))
        .await
        .unwrap()
}

/// Count log entries with `status` whose details contain `needle`.
pub fn count_entries(logs: &[RefetchLogEntry], status: RefetchStatus, needle: &str) -> usize {
    logs.iter()
        .filter(|e| e.status == status && e.details.contains(needle))
        .count()
}
