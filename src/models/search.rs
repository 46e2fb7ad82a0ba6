use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::Value;

/// The set of (source, table) pairs a search runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    /// Every table of every loaded source
    All,
    /// One table of one source
    Table { source_id: String, table: String },
}

/// One row that satisfied the search predicate.
///
/// Carries full provenance (source, table, row index) plus an owned snapshot
/// of the row, so it stays valid after the cached table is replaced or
/// evicted and is safe to move across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub source_id: String,
    pub table: String,
    /// Zero-based row index within the cached table the match was found in
    pub row_index: usize,
    /// Snapshot of the full row at match time, never a live reference
    pub row: Vec<Value>,
    /// Sorted indices of the columns that individually matched the term
    pub matched_columns: Vec<usize>,
}

/// Untruncated match count for one (source, table) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMatchCount {
    pub source_id: String,
    pub table: String,
    pub matched: usize,
}

/// The bounded, merged output of one search.
#[derive(Debug, Clone)]
pub struct SearchResultSet {
    /// Matches in stable (source id, table name, row index) order,
    /// truncated to the scope-dependent cap
    pub matches: Vec<SearchMatch>,
    /// Total matches across all tables before truncation
    pub total_matches: usize,
    /// Per-(source, table) untruncated counts, same ordering as `matches`
    pub table_counts: Vec<TableMatchCount>,
    pub elapsed: Duration,
    pub scope: SearchScope,
    /// Set when a searched table was replaced or evicted while the search
    /// ran; the results reflect the snapshot captured at start
    pub stale: bool,
}

impl SearchResultSet {
    pub(crate) fn empty(scope: SearchScope, elapsed: Duration) -> Self {
        Self {
            matches: Vec::new(),
            total_matches: 0,
            table_counts: Vec::new(),
            elapsed,
            scope,
            stale: false,
        }
    }

    /// True when the ordered sequence was cut at the scope cap
    pub fn truncated(&self) -> bool {
        self.total_matches > self.matches.len()
    }

    /// Matches counted but not materialized ("N more matches not shown")
    pub fn hidden_matches(&self) -> usize {
        self.total_matches - self.matches.len()
    }

    /// Untruncated match count for one table, 0 if it contributed nothing
    pub fn table_count(&self, source_id: &str, table: &str) -> usize {
        self.table_counts
            .iter()
            .find(|c| c.source_id == source_id && c.table == table)
            .map_or(0, |c| c.matched)
    }

    /// Untruncated match count across every table of one source
    pub fn source_count(&self, source_id: &str) -> usize {
        self.table_counts
            .iter()
            .filter(|c| c.source_id == source_id)
            .map(|c| c.matched)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result_set_is_not_truncated() {
        let set = SearchResultSet::empty(SearchScope::All, Duration::ZERO);
        assert!(!set.truncated());
        assert_eq!(set.hidden_matches(), 0);
        assert_eq!(set.table_count("db", "t"), 0);
        assert_eq!(set.source_count("db"), 0);
    }
}
