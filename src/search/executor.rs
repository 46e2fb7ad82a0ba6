//! Fan-out search over cached table snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::cache::{CachedTable, ColumnData};
use crate::models::SearchMatch;
use crate::models::value::canonical_temporal;
use crate::search::{CancelToken, SearchError};

/// Hard cap on search worker threads regardless of core count
pub const MAX_WORKERS: usize = 8;

/// Default per-table materialization cap
pub const DEFAULT_PER_TABLE_CAP: usize = 1000;

/// Rows scanned between cancellation/deadline checks
const ROW_BATCH: usize = 1024;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Matches materialized per table; counting continues past the cap so
    /// untruncated totals stay accurate
    pub per_table_cap: usize,
    /// Worker threads for the fan-out pool
    pub max_workers: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        let available = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self { per_table_cap: DEFAULT_PER_TABLE_CAP, max_workers: available.min(MAX_WORKERS) }
    }
}

/// Raw output of one per-table task.
#[derive(Debug)]
pub struct TableHits {
    pub source_id: String,
    pub table: String,
    /// Snapshot version the task scanned
    pub version: u64,
    /// Untruncated match count for this table
    pub matched: usize,
    /// At most `per_table_cap` materialized matches, in row order
    pub hits: Vec<SearchMatch>,
}

/// Runs predicate evaluation across table snapshots on a dedicated bounded
/// rayon pool, shared by all searches of one engine.
pub struct SearchExecutor {
    pool: rayon::ThreadPool,
    per_table_cap: usize,
}

impl SearchExecutor {
    pub fn new(options: &SearchOptions) -> Result<Self> {
        let workers = options.max_workers.clamp(1, MAX_WORKERS);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("tablescope-search-{i}"))
            .build()
            .context("Failed to build search worker pool")?;
        Ok(Self { pool, per_table_cap: options.per_table_cap })
    }

    /// Scan every given snapshot for the term. Cancellation and deadline
    /// expiry discard partial results and surface as errors; a table that
    /// matched nothing still contributes an entry with `matched = 0`.
    pub fn run(
        &self,
        term: &str,
        tables: &[Arc<CachedTable>],
        cancel: &CancelToken,
        deadline: Option<Instant>,
    ) -> Result<Vec<TableHits>, SearchError> {
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        let matcher = TermMatcher::new(term);
        let timed_out = AtomicBool::new(false);
        let cap = self.per_table_cap;

        let hits: Vec<TableHits> = self.pool.install(|| {
            tables
                .par_iter()
                .map(|table| scan_table(table, &matcher, cap, cancel, deadline, &timed_out))
                .collect()
        });

        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        if timed_out.load(Ordering::Relaxed) {
            return Err(SearchError::TimedOut);
        }
        Ok(hits)
    }
}

fn scan_table(
    table: &CachedTable,
    matcher: &TermMatcher,
    cap: usize,
    cancel: &CancelToken,
    deadline: Option<Instant>,
    timed_out: &AtomicBool,
) -> TableHits {
    let mut hits = Vec::new();
    let mut matched = 0usize;
    let mut matched_columns = Vec::new();

    for row in 0..table.row_count {
        if row % ROW_BATCH == 0 && interrupted(cancel, deadline, timed_out) {
            break;
        }

        matched_columns.clear();
        for (idx, column) in table.data.iter().enumerate() {
            if matcher.matches_cell(column, row) {
                matched_columns.push(idx);
            }
        }

        // A row counts once no matter how many columns matched
        if !matched_columns.is_empty() {
            matched += 1;
            if hits.len() < cap {
                hits.push(SearchMatch {
                    source_id: table.source_id.clone(),
                    table: table.name.clone(),
                    row_index: row,
                    row: table.row(row),
                    matched_columns: matched_columns.clone(),
                });
            }
        }
    }

    TableHits {
        source_id: table.source_id.clone(),
        table: table.name.clone(),
        version: table.version,
        matched,
        hits,
    }
}

fn interrupted(cancel: &CancelToken, deadline: Option<Instant>, timed_out: &AtomicBool) -> bool {
    if cancel.is_cancelled() {
        return true;
    }
    if let Some(deadline) = deadline
        && Instant::now() >= deadline
    {
        timed_out.store(true, Ordering::Relaxed);
        return true;
    }
    false
}

/// Pre-parsed search term: lowercased once, with numeric forms when the
/// term parses as a number.
struct TermMatcher {
    lower: String,
    as_int: Option<i64>,
    as_float: Option<f64>,
}

impl TermMatcher {
    fn new(term: &str) -> Self {
        let trimmed = term.trim();
        Self {
            lower: trimmed.to_lowercase(),
            as_int: trimmed.parse().ok(),
            as_float: trimmed.parse().ok(),
        }
    }

    /// Per-kind predicate: case-insensitive substring for text, exact
    /// equality for numeric columns when the term is numeric, substring on
    /// the canonical text form for booleans and temporals.
    fn matches_cell(&self, column: &ColumnData, row: usize) -> bool {
        match column {
            ColumnData::Int8(v) => v[row].is_some_and(|i| self.matches_int(i as i64)),
            ColumnData::Int16(v) => v[row].is_some_and(|i| self.matches_int(i as i64)),
            ColumnData::Int32(v) => v[row].is_some_and(|i| self.matches_int(i as i64)),
            ColumnData::Int64(v) => v[row].is_some_and(|i| self.matches_int(i)),
            ColumnData::Float32(v) => v[row].is_some_and(|f| self.matches_float(f as f64)),
            ColumnData::Float64(v) => v[row].is_some_and(|f| self.matches_float(f)),
            ColumnData::Text(v) => v[row]
                .as_ref()
                .is_some_and(|s| s.to_lowercase().contains(self.lower.as_str())),
            ColumnData::Bool(v) => v[row].is_some_and(|b| {
                let canonical = if b { "true" } else { "false" };
                canonical.contains(self.lower.as_str())
            }),
            ColumnData::Temporal(v) => v[row].is_some_and(|t| {
                canonical_temporal(&t).to_lowercase().contains(self.lower.as_str())
            }),
            ColumnData::Null(_) => false,
        }
    }

    fn matches_int(&self, value: i64) -> bool {
        match (self.as_int, self.as_float) {
            (Some(n), _) => value == n,
            (None, Some(f)) => value as f64 == f,
            (None, None) => false,
        }
    }

    fn matches_float(&self, value: f64) -> bool {
        self.as_float.is_some_and(|f| value == f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TablePayload, Value};
    use chrono::{TimeZone, Utc};

    fn table(payload: TablePayload) -> Arc<CachedTable> {
        Arc::new(CachedTable::build("db", payload).unwrap())
    }

    fn run_one(term: &str, t: &Arc<CachedTable>) -> TableHits {
        let executor = SearchExecutor::new(&SearchOptions::default()).unwrap();
        let mut hits = executor
            .run(term, std::slice::from_ref(t), &CancelToken::new(), None)
            .unwrap();
        hits.remove(0)
    }

    #[test]
    fn test_text_match_is_case_insensitive_substring() {
        let t = table(TablePayload::from_rows(
            "people",
            &["name"],
            vec![
                vec![Value::Text("Annabel".into())],
                vec![Value::Text("BOB".into())],
                vec![Value::Text("Joanne".into())],
            ],
        ));
        let hits = run_one("ann", &t);
        assert_eq!(hits.matched, 2);
        assert_eq!(hits.hits[0].row_index, 0);
        assert_eq!(hits.hits[1].row_index, 2);
    }

    #[test]
    fn test_numeric_columns_require_exact_match() {
        let t = table(TablePayload::from_rows(
            "nums",
            &["n"],
            vec![vec![Value::Int(30)], vec![Value::Int(301)], vec![Value::Int(3)]],
        ));
        let hits = run_one("30", &t);
        assert_eq!(hits.matched, 1);
        assert_eq!(hits.hits[0].row_index, 0);
        // Non-numeric terms never match numeric columns
        assert_eq!(run_one("thirty", &t).matched, 0);
    }

    #[test]
    fn test_bool_and_temporal_match_canonical_text() {
        let when = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let t = table(TablePayload::from_rows(
            "flags",
            &["active", "at"],
            vec![
                vec![Value::Bool(true), Value::Temporal(when)],
                vec![Value::Bool(false), Value::Null],
            ],
        ));
        assert_eq!(run_one("tru", &t).matched, 1);
        assert_eq!(run_one("2024-03", &t).matched, 1);
    }

    #[test]
    fn test_row_counted_once_with_matched_columns_recorded() {
        let t = table(TablePayload::from_rows(
            "orders",
            &["customer", "note"],
            vec![vec![Value::Text("Ann".into()), Value::Text("for Ann's team".into())]],
        ));
        let hits = run_one("ann", &t);
        assert_eq!(hits.matched, 1);
        assert_eq!(hits.hits[0].matched_columns, vec![0, 1]);
    }

    #[test]
    fn test_per_table_cap_stops_materializing_not_counting() {
        let rows = (0..100).map(|_| vec![Value::Text("aaa".into())]).collect();
        let t = table(TablePayload::from_rows("x", &["c"], rows));
        let executor =
            SearchExecutor::new(&SearchOptions { per_table_cap: 1, max_workers: 2 }).unwrap();
        let hits = executor
            .run("a", std::slice::from_ref(&t), &CancelToken::new(), None)
            .unwrap();
        assert_eq!(hits[0].hits.len(), 1);
        assert_eq!(hits[0].matched, 100);
    }

    #[test]
    fn test_pre_cancelled_search_returns_cancelled() {
        let t = table(TablePayload::from_rows("x", &["c"], vec![vec![Value::Text("a".into())]]));
        let executor = SearchExecutor::new(&SearchOptions::default()).unwrap();
        let token = CancelToken::new();
        token.cancel();
        let result = executor.run("a", std::slice::from_ref(&t), &token, None);
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_times_out() {
        let rows = (0..10).map(|i| vec![Value::Int(i)]).collect();
        let t = table(TablePayload::from_rows("x", &["c"], rows));
        let executor = SearchExecutor::new(&SearchOptions::default()).unwrap();
        let past = Instant::now() - std::time::Duration::from_secs(1);
        let result = executor.run("5", std::slice::from_ref(&t), &CancelToken::new(), Some(past));
        assert!(matches!(result, Err(SearchError::TimedOut)));
    }

    #[test]
    fn test_float_term_matches_int_column() {
        let t = table(TablePayload::from_rows("x", &["n"], vec![vec![Value::Int(5)]]));
        assert_eq!(run_one("5.0", &t).matched, 1);
    }
}
