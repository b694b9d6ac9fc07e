//! Transactional reindex pass orchestration.
//!
//! Coordinates the full flow: discovery → change detection → extraction →
//! fragment rewrite → strategy completion. Each (artifact, strategy) pair
//! is processed inside a single transaction: either every write for that
//! artifact commits, or none do and the artifact's prior committed state
//! survives. A failing artifact is reported and never aborts the run.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::catalog::{self, ArtifactMeta};
use crate::config::Config;
use crate::db::{Store, MARKER_INDEXER_VERSION};
use crate::extract;
use crate::migrate;
use crate::models::Fragment;
use crate::strategy::{self, Strategy};

/// One candidate recording found on disk, deduplicated by logical
/// filename (a compressed copy and an original of the same logical file
/// are the same artifact).
#[derive(Debug, Clone)]
pub struct DiscoveredArtifact {
    pub path: PathBuf,
    pub compressed: bool,
    pub size: i64,
    /// File mtime as epoch milliseconds; -1 when stats are unavailable,
    /// which conservatively counts as "changed".
    pub mtime: i64,
    pub meta: ArtifactMeta,
}

/// Per-artifact processing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Indexed,
    UpToDate,
}

/// Accumulated result of one reindex pass.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub indexed: u64,
    pub up_to_date: u64,
    pub failed: Vec<(String, String)>,
    /// Logical filename of the most-recently-modified artifact, which the
    /// pass skips because the recorder may still be writing it.
    pub skipped_active: Option<String>,
}

/// Discover candidate artifacts under the recordings and archive
/// locations. A missing or unreadable location yields zero artifacts
/// from that location; this never fails the run.
pub fn discover(config: &Config) -> Vec<DiscoveredArtifact> {
    let include = match build_globset(&config.recordings.include_globs) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Warning: invalid include_globs, discovery disabled: {}", e);
            return Vec::new();
        }
    };
    let exclude = match build_globset(&config.recordings.exclude_globs) {
        Ok(set) => set,
        Err(e) => {
            eprintln!("Warning: invalid exclude_globs, discovery disabled: {}", e);
            return Vec::new();
        }
    };

    let mut by_logical: BTreeMap<String, DiscoveredArtifact> = BTreeMap::new();

    let mut locations = vec![config.recordings.dir.clone()];
    if let Some(archive) = &config.recordings.archive_dir {
        locations.push(archive.clone());
    }

    for location in &locations {
        scan_location(location, &include, &exclude, &mut by_logical);
    }

    by_logical.into_values().collect()
}

fn scan_location(
    root: &Path,
    include: &GlobSet,
    exclude: &GlobSet,
    by_logical: &mut BTreeMap<String, DiscoveredArtifact>,
) {
    if !root.exists() {
        return;
    }

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude.is_match(&rel_str) || !include.is_match(&rel_str) {
            continue;
        }

        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_string(),
            None => continue,
        };
        let (logical, compressed) = match file_name.strip_suffix(".gz") {
            Some(stem) => (stem.to_string(), true),
            None => (file_name, false),
        };

        // Names outside the recording convention are silently excluded
        let meta = match catalog::parse_filename(&logical) {
            Some(meta) => meta,
            None => continue,
        };

        let (size, mtime) = file_fingerprint(path);

        let candidate = DiscoveredArtifact {
            path: path.to_path_buf(),
            compressed,
            size,
            mtime,
            meta,
        };

        // Prefer the plain variant when both forms of a logical file exist
        match by_logical.get(&logical) {
            Some(existing) if !existing.compressed => {}
            _ => {
                by_logical.insert(logical, candidate);
            }
        }
    }
}

/// (size, mtime-millis) fingerprint; (-1, -1) when stats are unavailable.
fn file_fingerprint(path: &Path) -> (i64, i64) {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => return (-1, -1),
    };
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|m| m.duration_since(std::time::SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(-1);
    (metadata.len() as i64, mtime)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Process one (artifact, strategy) pair inside a single transaction.
///
/// Steps: register/refresh in the catalog; no-op commit if up to date;
/// otherwise clear all fragments for the artifact, extract and insert
/// fresh ones, record the strategy application, and mark the artifact
/// completed. Any error rolls the whole transaction back.
pub async fn process(
    store: &Store,
    artifact: &DiscoveredArtifact,
    strategy: Strategy,
) -> Result<Outcome> {
    let mut tx = store.pool().begin().await?;
    let path = artifact.path.to_string_lossy().to_string();

    let artifact_id = catalog::register(
        &mut *tx,
        &path,
        &artifact.meta,
        artifact.size,
        artifact.mtime,
    )
    .await?;

    if catalog::is_up_to_date(&mut *tx, &artifact_id, strategy).await? {
        tx.commit().await?;
        return Ok(Outcome::UpToDate);
    }

    // No stale fragments may survive alongside fresh ones, and an
    // aborted previous attempt must not leave duplicates
    sqlx::query("DELETE FROM fragments_fts WHERE artifact_id = ?")
        .bind(&artifact_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM fragments WHERE artifact_id = ?")
        .bind(&artifact_id)
        .execute(&mut *tx)
        .await?;

    let events = extract::read_events(&artifact.path, artifact.compressed)?;
    let tags = artifact.meta.tags_joined();

    // Index 0 of the parsed stream is the session header, metadata-only
    for event in events.into_iter().skip(1) {
        if !strategy.accepts(event.channel) {
            continue;
        }
        let text = extract::strip_controls(&event.payload);
        if text.trim().is_empty() {
            continue;
        }

        let fragment = Fragment {
            id: Uuid::new_v4().to_string(),
            artifact_id: artifact_id.clone(),
            artifact_timestamp: artifact.meta.timestamp,
            time_offset: event.time_offset,
            text,
            tags: tags.clone(),
        };

        sqlx::query(
            r#"
            INSERT INTO fragments (id, artifact_id, artifact_timestamp, time_offset, text, tags)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fragment.id)
        .bind(&fragment.artifact_id)
        .bind(fragment.artifact_timestamp)
        .bind(fragment.time_offset)
        .bind(&fragment.text)
        .bind(&fragment.tags)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO fragments_fts (fragment_id, artifact_id, text) VALUES (?, ?, ?)")
            .bind(&fragment.id)
            .bind(&fragment.artifact_id)
            .bind(&fragment.text)
            .execute(&mut *tx)
            .await?;
    }

    let now = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        r#"
        INSERT INTO strategy_applications (artifact_id, strategy_id, strategy_version, completed_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(artifact_id, strategy_id, strategy_version)
            DO UPDATE SET completed_at = excluded.completed_at
        "#,
    )
    .bind(&artifact_id)
    .bind(strategy.id())
    .bind(strategy.version())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE artifacts SET completed = 1 WHERE id = ?")
        .bind(&artifact_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Outcome::Indexed)
}

/// Run a full reindex pass: every discovered artifact crossed with every
/// active strategy. The most-recently-modified artifact is skipped (the
/// recorder may still be writing it); per-artifact failures are collected
/// into the report and processing continues.
pub async fn run_all(store: &Store, config: &Config) -> Result<IndexReport> {
    let strategies = strategy::resolve_active(&config.indexer.current_strategies);

    // Record the configuration version; this marker does not by itself
    // force reprocessing
    let recorded = store.marker(MARKER_INDEXER_VERSION).await?;
    if recorded.as_deref() != Some(config.indexer.version.as_str()) {
        store
            .set_marker(MARKER_INDEXER_VERSION, &config.indexer.version)
            .await?;
    }

    let mut artifacts = discover(config);
    let mut report = IndexReport::default();

    // Skip the newest artifact by modification time; ties resolve to the
    // greatest logical filename so the choice is deterministic
    if let Some(newest) = artifacts
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            (a.mtime, &a.meta.filename).cmp(&(b.mtime, &b.meta.filename))
        })
        .map(|(i, _)| i)
    {
        let skipped = artifacts.remove(newest);
        report.skipped_active = Some(skipped.meta.filename);
    }

    for artifact in &artifacts {
        for strategy in &strategies {
            match process(store, artifact, *strategy).await {
                Ok(Outcome::Indexed) => report.indexed += 1,
                Ok(Outcome::UpToDate) => report.up_to_date += 1,
                Err(e) => {
                    let path = artifact.path.to_string_lossy().to_string();
                    eprintln!("Warning: failed to index {}: {}", path, e);
                    report.failed.push((path, e.to_string()));
                }
            }
        }
    }

    Ok(report)
}

/// CLI entry point for `cdx reindex`.
pub async fn run_reindex(config: &Config) -> Result<()> {
    let store = Store::open(config).await?;
    migrate::run_migrations(&store).await?;

    let result = run_all(&store, config).await;
    store.close().await;
    let report = result?;

    println!("reindex");
    println!("  indexed: {}", report.indexed);
    println!("  up to date: {}", report.up_to_date);
    println!("  failed: {}", report.failed.len());
    for (path, error) in &report.failed {
        println!("    {}: {}", path, error);
    }
    if let Some(active) = &report.skipped_active {
        println!("  skipped active recording: {}", active);
    }
    println!("ok");

    Ok(())
}
