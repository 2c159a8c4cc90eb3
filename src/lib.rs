//! feedsync - feed refetch reconciliation engine
//!
//! Keeps a local SQLite article store in sync with subscribed RSS/Atom
//! feeds, with an append-only audit trail of every refetch attempt.

pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use config::Config;
pub use db::{Database, FeedStore, SqlFeedStore};
pub use error::{FeedSyncError, Result};
pub use feed::{
    FeedParser, FeedService, HttpFeedParser, RefetchOrchestrator, RunSummary, Scheduler,
    SchedulerHandle,
};
