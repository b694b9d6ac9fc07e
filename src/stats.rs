//! Index statistics overview.
//!
//! Read-only, non-transactional summary of the catalog: artifact counts,
//! per-strategy application counts at their current versions, and the
//! recorded version markers. Used by `cdx stats` to give confidence that
//! reindex passes are keeping up.

use anyhow::Result;
use std::collections::BTreeMap;

use crate::config::Config;
use crate::db::{Store, MARKER_INDEXER_VERSION, MARKER_SCHEMA_VERSION};
use crate::strategy::Strategy;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyStats {
    pub version: String,
    pub count: i64,
}

#[derive(Debug)]
pub struct IndexStats {
    pub total_files: i64,
    pub indexed_files: i64,
    pub strategies: BTreeMap<String, StrategyStats>,
    pub indexer_version: String,
    pub schema_version: String,
}

pub async fn get_index_stats(store: &Store) -> Result<IndexStats> {
    let pool = store.pool();

    let total_files: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artifacts")
        .fetch_one(pool)
        .await?;

    let indexed_files: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM artifacts WHERE completed = 1")
            .fetch_one(pool)
            .await?;

    let mut strategies = BTreeMap::new();
    for strategy in Strategy::ALL {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM strategy_applications
            WHERE strategy_id = ? AND strategy_version = ? AND completed_at IS NOT NULL
            "#,
        )
        .bind(strategy.id())
        .bind(strategy.version())
        .fetch_one(pool)
        .await?;

        strategies.insert(
            strategy.id().to_string(),
            StrategyStats {
                version: strategy.version().to_string(),
                count,
            },
        );
    }

    let indexer_version = store
        .marker(MARKER_INDEXER_VERSION)
        .await?
        .unwrap_or_default();
    let schema_version = store
        .marker(MARKER_SCHEMA_VERSION)
        .await?
        .unwrap_or_default();

    Ok(IndexStats {
        total_files,
        indexed_files,
        strategies,
        indexer_version,
        schema_version,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = Store::open(config).await?;
    let result = get_index_stats(&store).await;
    store.close().await;
    let stats = result?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("cast-index — Index Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Recordings:  {}", stats.total_files);
    println!("  Indexed:     {}", stats.indexed_files);
    println!();
    println!("  By strategy:");
    println!("  {:<20} {:>8} {:>8}", "STRATEGY", "VERSION", "COUNT");
    for (id, s) in &stats.strategies {
        println!("  {:<20} {:>8} {:>8}", id, s.version, s.count);
    }
    println!();
    println!("  Indexer version: {}", stats.indexer_version);
    println!("  Schema version:  {}", stats.schema_version);
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
