//! Artifact catalog and change detection.
//!
//! The catalog is the persistent registry of known recordings, keyed by
//! path. Registration compares the stored (size, mtime) fingerprint
//! against the live file; any difference resets the artifact's
//! `completed` flag so the indexer reprocesses it. All writes here run
//! on the caller's transaction.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::strategy::Strategy;

/// Metadata derived from a logical recording filename,
/// `YYYY-MM-DD_HH-MM-SS[_tags_tag1-tag2-...].cast`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMeta {
    pub filename: String,
    pub date: String,
    pub time: String,
    /// Recording start as epoch milliseconds.
    pub timestamp: i64,
    pub tags: Vec<String>,
}

impl ArtifactMeta {
    /// Tags joined for storage alongside each fragment.
    pub fn tags_joined(&self) -> String {
        self.tags.join(", ")
    }
}

/// Parse a logical filename into its date/time/tag parts. Returns `None`
/// for names outside the recording convention; those artifacts are
/// silently excluded from indexing.
pub fn parse_filename(filename: &str) -> Option<ArtifactMeta> {
    let stem = filename.strip_suffix(".cast")?;

    // Checked slicing: a multi-byte character straddling a field boundary
    // makes `get` return None, and the name is excluded like any other
    // nonconforming one
    let date_part = stem.get(..10)?;
    if stem.as_bytes().get(10) != Some(&b'_') {
        return None;
    }
    let time_part = stem.get(11..19)?;

    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time_part, "%H-%M-%S").ok()?;
    let timestamp = date.and_time(time).and_utc().timestamp_millis();

    let rest = stem.get(19..)?;
    let tags = if rest.is_empty() {
        Vec::new()
    } else if let Some(tag_list) = rest.strip_prefix("_tags_") {
        let tags: Vec<String> = tag_list
            .split('-')
            .filter(|t| !t.is_empty())
            .map(|t| t.to_string())
            .collect();
        if tags.is_empty() {
            return None;
        }
        tags
    } else {
        return None;
    };

    Some(ArtifactMeta {
        filename: filename.to_string(),
        date: date_part.to_string(),
        time: time_part.to_string(),
        timestamp,
        tags,
    })
}

/// Register or refresh an artifact by path, returning its catalog id.
///
/// Unknown paths are inserted with `completed = false`. Known paths keep
/// their record untouched when the (size, mtime) fingerprint matches; a
/// mismatch updates the stats in place and resets `completed`. A negative
/// size or mtime marks unavailable stats and never matches, so such an
/// artifact is always treated as changed.
pub async fn register(
    conn: &mut SqliteConnection,
    path: &str,
    meta: &ArtifactMeta,
    size: i64,
    mtime: i64,
) -> Result<String> {
    let existing = sqlx::query("SELECT id, size, mtime FROM artifacts WHERE path = ?")
        .bind(path)
        .fetch_optional(&mut *conn)
        .await?;

    if let Some(row) = existing {
        let id: String = row.get("id");
        let stored_size: i64 = row.get("size");
        let stored_mtime: i64 = row.get("mtime");

        let stats_available = size >= 0 && mtime >= 0 && stored_size >= 0 && stored_mtime >= 0;
        if stats_available && stored_size == size && stored_mtime == mtime {
            return Ok(id);
        }

        sqlx::query("UPDATE artifacts SET size = ?, mtime = ?, completed = 0 WHERE id = ?")
            .bind(size)
            .bind(mtime)
            .bind(&id)
            .execute(&mut *conn)
            .await?;

        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp_millis();

    sqlx::query(
        r#"
        INSERT INTO artifacts (id, path, filename, date, time, timestamp, size, mtime, registered_at, completed)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        "#,
    )
    .bind(&id)
    .bind(path)
    .bind(&meta.filename)
    .bind(&meta.date)
    .bind(&meta.time)
    .bind(meta.timestamp)
    .bind(size)
    .bind(mtime)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// True only when the artifact is marked completed *and* an application
/// record exists for this exact strategy id + version with a non-null
/// completion timestamp. An artifact modified after the strategy was
/// applied fails the first condition even if a stale record survives.
pub async fn is_up_to_date(
    conn: &mut SqliteConnection,
    artifact_id: &str,
    strategy: Strategy,
) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM artifacts a
        JOIN strategy_applications sa ON sa.artifact_id = a.id
        WHERE a.id = ?
          AND a.completed = 1
          AND sa.strategy_id = ?
          AND sa.strategy_version = ?
          AND sa.completed_at IS NOT NULL
        "#,
    )
    .bind(artifact_id)
    .bind(strategy.id())
    .bind(strategy.version())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_filename() {
        let meta = parse_filename("2025-03-01_14-30-00.cast").unwrap();
        assert_eq!(meta.date, "2025-03-01");
        assert_eq!(meta.time, "14-30-00");
        assert!(meta.tags.is_empty());
        assert_eq!(meta.tags_joined(), "");
    }

    #[test]
    fn test_parse_tagged_filename() {
        let meta = parse_filename("2025-03-01_14-30-00_tags_work-demo.cast").unwrap();
        assert_eq!(meta.tags, vec!["work", "demo"]);
        assert_eq!(meta.tags_joined(), "work, demo");
    }

    #[test]
    fn test_timestamp_derivation() {
        let meta = parse_filename("1970-01-01_00-10-00.cast").unwrap();
        assert_eq!(meta.timestamp, 10 * 60 * 1000);
    }

    #[test]
    fn test_rejects_nonconforming_names() {
        assert!(parse_filename("notes.txt").is_none());
        assert!(parse_filename("session.cast").is_none());
        assert!(parse_filename("2025-13-01_14-30-00.cast").is_none());
        assert!(parse_filename("2025-03-01_25-00-00.cast").is_none());
        assert!(parse_filename("2025-03-01-14-30-00.cast").is_none());
        assert!(parse_filename("2025-03-01_14-30-00_extra.cast").is_none());
        assert!(parse_filename("2025-03-01_14-30-00_tags_.cast").is_none());
    }

    #[test]
    fn test_rejects_multibyte_names_without_panicking() {
        // é straddles the byte-10 boundary of the date field
        assert!(parse_filename("123456789\u{e9}123456789.cast").is_none());
        assert!(parse_filename("caf\u{e9}-notes.cast").is_none());
        assert!(parse_filename("2025-03-01_14-30-0\u{e9}.cast").is_none());
        assert!(parse_filename("2025-03-01_14-30-00_tags_caf\u{e9}.cast").is_some());
    }
}
