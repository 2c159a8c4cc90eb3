//! Database module for feedsync.
//!
//! This module provides SQLite connectivity, migration management and the
//! `FeedStore` abstraction the refetch engine is written against.

mod schema;
mod store;
mod traits;

pub use schema::MIGRATIONS;
pub use store::SqlFeedStore;
pub use traits::FeedStore;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info};

use crate::Result;

/// Connection pool type used by the repositories.
pub type DbPool = sqlx::SqlitePool;

/// Maximum pooled connections for a file database.
const MAX_CONNECTIONS: u32 = 5;

/// Database wrapper for managing the connection pool and migrations.
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// If the database file doesn't exist, it will be created.
    /// Migrations are automatically applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool holds a single connection that never expires, since every
    /// new in-memory connection would otherwise see an empty database.
    pub async fn open_in_memory() -> Result<Self> {
        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;
        Ok(version)
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     INTEGER PRIMARY KEY,
                applied_at  TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = $1)",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Close the pool, waiting for connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_tables_exist() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(db.table_exists("feeds").await.unwrap());
        assert!(db.table_exists("articles").await.unwrap());
        assert!(db.table_exists("refetch_logs").await.unwrap());
        assert!(db.table_exists("schema_version").await.unwrap());
        assert!(!db.table_exists("users").await.unwrap());
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        db.migrate().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_article_link_unique() {
        let db = Database::open_in_memory().await.unwrap();

        let insert = "INSERT INTO articles (title, link, content, feed_title) VALUES ($1, $2, $3, $4)";
        sqlx::query(insert)
            .bind("A")
            .bind("https://example.com/a")
            .bind("body")
            .bind("Feed")
            .execute(db.pool())
            .await
            .unwrap();

        let duplicate = sqlx::query(insert)
            .bind("A again")
            .bind("https://example.com/a")
            .bind("body")
            .bind("Other Feed")
            .execute(db.pool())
            .await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("feeds.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            assert!(db.table_exists("feeds").await.unwrap());
            db.close().await;
        }

        // Reopen: migrations should not be reapplied
        let db = Database::open(&db_path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap() as usize, MIGRATIONS.len());
        db.close().await;
    }
}
