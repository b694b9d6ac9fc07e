use anyhow::Result;

use crate::db::{Store, MARKER_SCHEMA_VERSION};

/// Current schema version. A database carrying an older marker gets its
/// `completed` flags cleared so the next reindex pass rebuilds everything.
pub const SCHEMA_VERSION: &str = "2";

pub async fn run_migrations(store: &Store) -> Result<()> {
    let pool = store.pool();

    // Version markers
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Artifact catalog
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS artifacts (
            id TEXT PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            filename TEXT NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            size INTEGER NOT NULL,
            mtime INTEGER NOT NULL,
            registered_at INTEGER NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Strategy application records
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS strategy_applications (
            artifact_id TEXT NOT NULL,
            strategy_id TEXT NOT NULL,
            strategy_version TEXT NOT NULL,
            completed_at INTEGER,
            PRIMARY KEY (artifact_id, strategy_id, strategy_version),
            FOREIGN KEY (artifact_id) REFERENCES artifacts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Fragment store
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fragments (
            id TEXT PRIMARY KEY,
            artifact_id TEXT NOT NULL,
            artifact_timestamp INTEGER NOT NULL,
            time_offset REAL NOT NULL,
            text TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '',
            FOREIGN KEY (artifact_id) REFERENCES artifacts(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create FTS5 virtual table over fragments
    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='fragments_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE fragments_fts USING fts5(
                fragment_id UNINDEXED,
                artifact_id UNINDEXED,
                text
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_fragments_artifact_id ON fragments(artifact_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fragments_timestamp ON fragments(artifact_timestamp DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_artifacts_date ON artifacts(date)")
        .execute(pool)
        .await?;

    // A schema bump on an existing database forces a full reindex on the
    // next pass; reprocessing itself stays per-(artifact, strategy-version).
    let stored = store.marker(MARKER_SCHEMA_VERSION).await?;
    match stored {
        Some(version) if version != SCHEMA_VERSION => {
            sqlx::query("UPDATE artifacts SET completed = 0")
                .execute(pool)
                .await?;
            store.set_marker(MARKER_SCHEMA_VERSION, SCHEMA_VERSION).await?;
        }
        Some(_) => {}
        None => {
            store.set_marker(MARKER_SCHEMA_VERSION, SCHEMA_VERSION).await?;
        }
    }

    Ok(())
}
