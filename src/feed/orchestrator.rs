//! Full refetch runs over every subscribed feed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};

use super::audit::{self, AuditLog};
use super::executor::RefetchExecutor;
use crate::db::FeedStore;
use crate::Result;

/// Totals for one full refetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Feeds attempted.
    pub feeds: usize,
    /// Feeds refetched without error.
    pub succeeded: usize,
    /// Feeds that failed (each already has its own failure entry).
    pub failed: usize,
    /// New articles across all succeeding feeds.
    pub new_articles: usize,
}

/// Runs the executor over all feeds, with at most one run in flight.
pub struct RefetchOrchestrator {
    store: Arc<dyn FeedStore>,
    executor: RefetchExecutor,
    audit: AuditLog,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when dropped.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RefetchOrchestrator {
    /// Create an orchestrator that lists feeds from `store` and refetches
    /// each one through `executor`.
    pub fn new(store: Arc<dyn FeedStore>, executor: RefetchExecutor) -> Self {
        Self {
            audit: AuditLog::new(store.clone()),
            store,
            executor,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns true while a run started through `try_refetch_all` is active.
    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run a refetch unless one is already in flight.
    ///
    /// Returns `None` without touching the audit trail if another run
    /// holds the flag.
    pub async fn try_refetch_all(&self) -> Option<Result<RunSummary>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        let _guard = InFlightGuard(&self.in_flight);

        Some(self.refetch_all().await)
    }

    /// Refetch every feed, isolating per-feed failures.
    ///
    /// Only a failure to list feeds fails the run. This does not consult
    /// the in-flight flag; use `try_refetch_all` for guarded runs.
    pub async fn refetch_all(&self) -> Result<RunSummary> {
        self.audit.started(audit::RUN_STARTED).await;

        let feeds = match self.store.list_feeds().await {
            Ok(feeds) => feeds,
            Err(e) => {
                error!("Failed to list feeds for refetch: {}", e);
                self.audit.failure(&e.to_string()).await;
                return Err(e);
            }
        };

        let mut summary = RunSummary {
            feeds: feeds.len(),
            ..RunSummary::default()
        };

        for feed in &feeds {
            match self.executor.refetch_one(feed).await {
                Ok(new_count) => {
                    summary.succeeded += 1;
                    summary.new_articles += new_count;
                }
                // Already audited by the executor
                Err(_) => summary.failed += 1,
            }
        }

        self.audit
            .success(&audit::run_succeeded(summary.new_articles))
            .await;

        Ok(summary)
    }

    /// Scheduler entry point: run if idle and log the outcome.
    pub async fn trigger_now(&self) {
        match self.try_refetch_all().await {
            None => warn!("Refetch already in progress, skipping trigger"),
            Some(Ok(summary)) => info!(
                "Refetch complete: {} feeds, {} failed, {} new articles",
                summary.feeds, summary.failed, summary.new_articles
            ),
            Some(Err(e)) => error!("Refetch run failed: {}", e),
        }
    }
}
