//! Database handle shared by every component.
//!
//! [`Store`] wraps the SQLite pool and the version-marker table. It is
//! opened once per run and closed on completion; all catalog, fragment,
//! and strategy state lives in the same database so one transaction can
//! cover all of it.

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::Config;

/// Version-marker key for the last-applied schema.
pub const MARKER_SCHEMA_VERSION: &str = "schema_version";
/// Version-marker key for the last-seen indexer configuration version.
pub const MARKER_INDEXER_VERSION: &str = "indexer_version";

pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the index database for this run.
    pub async fn open(config: &Config) -> Result<Store> {
        let db_path = &config.db.path;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Store { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }

    /// Read a version marker, `None` if it has never been written.
    pub async fn marker(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM meta WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set_marker(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
