//! Database schema and migrations for feedsync.
//!
//! Migrations are applied in order; the schema_version table records
//! which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: feeds, articles and the refetch audit trail
    r#"
CREATE TABLE feeds (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    url     TEXT NOT NULL UNIQUE,
    title   TEXT NOT NULL
);

-- link is the deduplication key across all feeds
CREATE TABLE articles (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    title       TEXT NOT NULL,
    link        TEXT NOT NULL UNIQUE,
    content     TEXT,
    feed_title  TEXT NOT NULL
);

-- append-only: rows are never updated or deleted
CREATE TABLE refetch_logs (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp   TEXT NOT NULL,
    status      TEXT NOT NULL,
    details     TEXT
);
"#,
    // v2: lookup indexes for feed deletion/counting and history listing
    r#"
CREATE INDEX idx_articles_feed_title ON articles(feed_title);
CREATE INDEX idx_refetch_logs_timestamp ON refetch_logs(timestamp DESC);
"#,
];
