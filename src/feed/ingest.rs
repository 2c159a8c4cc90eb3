//! Article ingestion.
//!
//! Every article write goes through `Ingestor::ingest`, which relies on the
//! store's atomic insert-if-absent so that repeated or concurrent calls
//! with the same link leave exactly one row.

use std::sync::Arc;

use tracing::{debug, warn};

use super::types::{CandidateArticle, IngestOutcome, ParsedItem};
use crate::db::FeedStore;
use crate::Result;

/// Summary of ingesting a batch of parsed items.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Candidates that were newly stored, in input order.
    pub inserted: Vec<CandidateArticle>,
    /// Items whose link was already stored.
    pub already_present: usize,
    /// Items rejected before reaching the store (no link).
    pub rejected: usize,
}

impl IngestReport {
    /// Number of newly stored articles.
    pub fn new_count(&self) -> usize {
        self.inserted.len()
    }
}

/// Idempotent article writer.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn FeedStore>,
}

impl Ingestor {
    /// Create an ingestor over a store.
    pub fn new(store: Arc<dyn FeedStore>) -> Self {
        Self { store }
    }

    /// Store a candidate unless an article with the same link exists.
    pub async fn ingest(&self, candidate: &CandidateArticle) -> Result<IngestOutcome> {
        if self.store.insert_article_if_absent(candidate).await? {
            debug!("Stored article {}", candidate.link);
            Ok(IngestOutcome::Inserted)
        } else {
            Ok(IngestOutcome::AlreadyPresent)
        }
    }

    /// Validate and ingest parsed items under `feed_title`.
    ///
    /// Stops at the first store error; articles stored before it stay.
    pub async fn ingest_items(
        &self,
        feed_title: &str,
        items: Vec<ParsedItem>,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for item in items {
            let candidate = match CandidateArticle::from_parsed(item, feed_title) {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!("Skipping item from '{}': {}", feed_title, e);
                    report.rejected += 1;
                    continue;
                }
            };

            match self.ingest(&candidate).await? {
                IngestOutcome::Inserted => report.inserted.push(candidate),
                IngestOutcome::AlreadyPresent => report.already_present += 1,
            }
        }

        Ok(report)
    }
}
