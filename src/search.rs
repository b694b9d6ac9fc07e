//! Full-text query engine.
//!
//! Executes phrase queries against the fragment index with tag and date
//! filters, optional time-window deduplication, and pagination. Only
//! fragments whose owning artifact is `completed` are visible; a partially
//! written artifact never leaks into results.

use anyhow::{bail, Result};
use chrono::NaiveDate;
use sqlx::Row;
use std::collections::HashMap;

use crate::config::Config;
use crate::db::Store;
use crate::models::SearchHit;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    /// A fragment matches when its joined tag string contains *any*
    /// requested tag as a substring.
    pub tags: Vec<String>,
    /// Inclusive lower bound on the artifact date (`YYYY-MM-DD`).
    pub date_from: Option<String>,
    /// Inclusive upper bound on the artifact date (`YYYY-MM-DD`).
    pub date_to: Option<String>,
    pub limit: i64,
    /// One-based page number; `offset = (page - 1) * limit`.
    pub page: i64,
    /// Deduplication window in minutes; `<= 0` disables deduplication.
    pub time_window_minutes: i64,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            tags: Vec::new(),
            date_from: None,
            date_to: None,
            limit: 20,
            page: 1,
            time_window_minutes: 0,
        }
    }
}

#[derive(Debug)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Count of the filtered, deduplicated result set before slicing.
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// One matching fragment row joined with its artifact metadata.
#[derive(Debug, Clone)]
struct FragmentRow {
    id: String,
    text: String,
    artifact_timestamp: i64,
    time_offset: f64,
    tags: String,
    filename: String,
    date: String,
    time: String,
}

/// Execute a search against the store.
pub async fn search(store: &Store, request: &SearchRequest) -> Result<SearchResponse> {
    if request.query.trim().is_empty() {
        bail!("search query must not be empty");
    }
    if request.limit < 1 {
        bail!("limit must be >= 1");
    }
    if request.page < 1 {
        bail!("page must be >= 1");
    }
    for bound in [&request.date_from, &request.date_to].into_iter().flatten() {
        if NaiveDate::parse_from_str(bound, "%Y-%m-%d").is_err() {
            bail!("invalid date filter: '{}', expected YYYY-MM-DD", bound);
        }
    }

    let mut sql = String::from(
        r#"
        SELECT f.id, f.text, f.artifact_timestamp, f.time_offset, f.tags,
               a.filename, a.date, a.time
        FROM fragments_fts
        JOIN fragments f ON f.id = fragments_fts.fragment_id
        JOIN artifacts a ON a.id = f.artifact_id
        WHERE fragments_fts MATCH ?
          AND a.completed = 1
        "#,
    );

    if request.date_from.is_some() {
        sql.push_str(" AND a.date >= ?");
    }
    if request.date_to.is_some() {
        sql.push_str(" AND a.date <= ?");
    }
    if !request.tags.is_empty() {
        let clauses = vec!["f.tags LIKE ?"; request.tags.len()].join(" OR ");
        sql.push_str(&format!(" AND ({})", clauses));
    }
    sql.push_str(" ORDER BY f.artifact_timestamp DESC, f.time_offset ASC, f.id DESC");

    let mut query = sqlx::query(&sql).bind(fts_phrase(&request.query));
    if let Some(from) = &request.date_from {
        query = query.bind(from);
    }
    if let Some(to) = &request.date_to {
        query = query.bind(to);
    }
    for tag in &request.tags {
        query = query.bind(format!("%{}%", tag));
    }

    let rows = query.fetch_all(store.pool()).await?;

    let mut matches: Vec<FragmentRow> = rows
        .iter()
        .map(|row| FragmentRow {
            id: row.get("id"),
            text: row.get("text"),
            artifact_timestamp: row.get("artifact_timestamp"),
            time_offset: row.get("time_offset"),
            tags: row.get("tags"),
            filename: row.get("filename"),
            date: row.get("date"),
            time: row.get("time"),
        })
        .collect();

    if request.time_window_minutes > 0 {
        matches = dedup_time_window(matches, request.time_window_minutes);
    }

    let total = matches.len() as i64;
    let total_pages = if total == 0 {
        0
    } else {
        (total + request.limit - 1) / request.limit
    };
    let offset = (request.page - 1) * request.limit;
    let has_more = request.page < total_pages;

    let results = matches
        .into_iter()
        .skip(offset as usize)
        .take(request.limit as usize)
        .map(|row| SearchHit {
            text: row.text,
            artifact_filename: row.filename,
            date: row.date,
            time: row.time,
            time_offset_seconds: row.time_offset,
            tags: split_tags(&row.tags),
        })
        .collect();

    Ok(SearchResponse {
        results,
        total,
        page: request.page,
        total_pages,
        has_more,
    })
}

/// Quote the user's text as an FTS5 phrase so it can never be parsed as
/// query syntax. Embedded double quotes are doubled per FTS5 rules.
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.trim().replace('"', "\"\""))
}

fn split_tags(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Partition matches into `floor(timestamp / window)` buckets and keep
/// only the latest fragment per bucket, ties broken by fragment id.
/// Windows are global across artifacts: near-simultaneous matches from
/// different recordings collapse together.
fn dedup_time_window(matches: Vec<FragmentRow>, window_minutes: i64) -> Vec<FragmentRow> {
    let window_ms = window_minutes * 60 * 1000;
    let mut best: HashMap<i64, FragmentRow> = HashMap::new();

    for row in matches {
        let bucket = row.artifact_timestamp.div_euclid(window_ms);
        match best.get(&bucket) {
            Some(current)
                if (current.artifact_timestamp, current.id.as_str())
                    >= (row.artifact_timestamp, row.id.as_str()) => {}
            _ => {
                best.insert(bucket, row);
            }
        }
    }

    let mut deduped: Vec<FragmentRow> = best.into_values().collect();
    deduped.sort_by(|a, b| {
        b.artifact_timestamp
            .cmp(&a.artifact_timestamp)
            .then(b.id.cmp(&a.id))
    });
    deduped
}

/// CLI entry point for `cdx search`.
#[allow(clippy::too_many_arguments)]
pub async fn run_search(
    config: &Config,
    query: &str,
    tags: Vec<String>,
    date_from: Option<String>,
    date_to: Option<String>,
    limit: Option<i64>,
    page: Option<i64>,
    window: Option<i64>,
) -> Result<()> {
    let request = SearchRequest {
        query: query.to_string(),
        tags,
        date_from,
        date_to,
        limit: limit.unwrap_or(config.indexer.page_size),
        page: page.unwrap_or(1),
        time_window_minutes: window.unwrap_or(config.indexer.default_time_window_minutes),
    };

    let store = Store::open(config).await?;
    let result = search(&store, &request).await;
    store.close().await;
    let response = result?;

    if response.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in response.results.iter().enumerate() {
        let rank = (response.page - 1) * request.limit + i as i64 + 1;
        let tag_display = if hit.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", hit.tags.join(", "))
        };
        println!(
            "{}. {} {}{} +{:.1}s",
            rank,
            hit.date,
            hit.time.replace('-', ":"),
            tag_display,
            hit.time_offset_seconds
        );
        println!("    \"{}\"", hit.text.replace('\n', " ").trim());
        println!();
    }
    println!(
        "total: {}  page: {}/{}{}",
        response.total,
        response.page,
        response.total_pages,
        if response.has_more { "  (more)" } else { "" }
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(id: &str, timestamp: i64) -> FragmentRow {
        FragmentRow {
            id: id.to_string(),
            text: format!("fragment {}", id),
            artifact_timestamp: timestamp,
            time_offset: 0.0,
            tags: String::new(),
            filename: String::new(),
            date: String::new(),
            time: String::new(),
        }
    }

    const MIN: i64 = 60 * 1000;

    #[test]
    fn test_window_keeps_latest_per_bucket() {
        // T, T+2min, T+9min share a 10-minute bucket; T+15min stands alone
        let t = 1_000 * MIN * 10; // aligned to a 10-minute boundary
        let rows = vec![
            make_row("a", t),
            make_row("b", t + 2 * MIN),
            make_row("c", t + 9 * MIN),
            make_row("d", t + 15 * MIN),
        ];

        let deduped = dedup_time_window(rows, 10);
        let ids: Vec<&str> = deduped.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "c"]);
    }

    #[test]
    fn test_window_tie_breaks_on_id() {
        let rows = vec![make_row("a", 5 * MIN), make_row("b", 5 * MIN)];
        let deduped = dedup_time_window(rows, 10);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].id, "b");
    }

    #[test]
    fn test_window_orders_descending() {
        let rows = vec![
            make_row("a", 0),
            make_row("b", 30 * MIN),
            make_row("c", 60 * MIN),
        ];
        let deduped = dedup_time_window(rows, 10);
        let ids: Vec<&str> = deduped.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_window_is_deterministic() {
        let rows = vec![
            make_row("a", 3 * MIN),
            make_row("b", 3 * MIN),
            make_row("c", 25 * MIN),
        ];
        let first = dedup_time_window(rows.clone(), 10);
        let second = dedup_time_window(rows, 10);
        let ids = |v: &[FragmentRow]| v.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_fts_phrase_quoting() {
        assert_eq!(fts_phrase("cargo build"), "\"cargo build\"");
        assert_eq!(fts_phrase("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(fts_phrase("  trimmed  "), "\"trimmed\"");
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("work, demo"), vec!["work", "demo"]);
        assert_eq!(split_tags(""), Vec::<String>::new());
    }
}
