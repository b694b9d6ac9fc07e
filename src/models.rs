//! Core data models used throughout cast-index.
//!
//! These types represent the artifacts, fragments, and search results that
//! flow through the indexing and query pipeline.

/// A recording registered in the catalog, one row per logical recording.
///
/// `completed` is true only after at least one strategy has been applied
/// end-to-end inside a committed transaction. A size or mtime change on
/// the underlying file resets it to false.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ArtifactRecord {
    pub id: String,
    pub path: String,
    pub filename: String,
    /// Recording date derived from the filename (`YYYY-MM-DD`).
    pub date: String,
    /// Recording start time derived from the filename (`HH-MM-SS`).
    pub time: String,
    /// Recording start as epoch milliseconds, derived from date + time.
    pub timestamp: i64,
    pub size: i64,
    /// Modification fingerprint: file mtime as epoch milliseconds.
    pub mtime: i64,
    pub registered_at: i64,
    pub completed: bool,
}

/// One fully-applied (artifact, strategy id, strategy version) tuple.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct StrategyApplication {
    pub artifact_id: String,
    pub strategy_id: String,
    pub strategy_version: String,
    pub completed_at: Option<i64>,
}

/// One indexed unit of searchable text extracted from a recording.
///
/// Fragments are append-only within a processing transaction and are
/// deleted and rewritten wholesale whenever their artifact is reprocessed.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub id: String,
    pub artifact_id: String,
    pub artifact_timestamp: i64,
    pub time_offset: f64,
    pub text: String,
    /// Tags joined with `", "`, derived from the filename at indexing time.
    pub tags: String,
}

/// A search result returned from the query engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub artifact_filename: String,
    pub date: String,
    pub time: String,
    pub time_offset_seconds: f64,
    pub tags: Vec<String>,
}
