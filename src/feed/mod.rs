//! Feed refetch engine for feedsync.
//!
//! This module keeps the local article store in sync with subscribed
//! feeds:
//!
//! - `ingest`: idempotent article writes keyed by link
//! - `executor`: refetch of a single feed under a fetch timeout
//! - `audit`: the append-only refetch log
//! - `orchestrator`: full runs over all feeds with a single-flight guard
//! - `scheduler`: interval or cron driven background runs
//! - `service`: feed and article operations for a request layer

pub mod audit;
pub mod executor;
pub mod ingest;
pub mod orchestrator;
pub mod parser;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod types;

pub use audit::AuditLog;
pub use executor::RefetchExecutor;
pub use ingest::{IngestReport, Ingestor};
pub use orchestrator::{RefetchOrchestrator, RunSummary};
pub use parser::{parse_feed, strip_html, validate_url, FeedParser, HttpFeedParser};
pub use repository::{ArticleRepository, FeedRepository, RefetchLogRepository};
pub use scheduler::{parse_cron_expression, Cadence, Scheduler, SchedulerHandle};
pub use service::{AddedFeed, FeedDetails, FeedService, SnapshotImport};
pub use types::{
    Article, CandidateArticle, Feed, IngestOutcome, NewFeed, ParsedFeed, ParsedItem,
    RefetchLogEntry, RefetchStatus, Snapshot, SnapshotArticle, MAX_CONTENT_LENGTH, UNTITLED,
};
