//! Merging per-table task output into one bounded result set.

use std::time::Duration;

use crate::models::{SearchResultSet, SearchScope, TableMatchCount};
use crate::search::executor::TableHits;

/// Default final caps applied after merging, by scope
pub const DEFAULT_ALL_SCOPE_CAP: usize = 5000;
pub const DEFAULT_TABLE_SCOPE_CAP: usize = 2000;

#[derive(Debug, Clone, Copy)]
pub struct AggregateCaps {
    pub all_scope: usize,
    pub table_scope: usize,
}

impl Default for AggregateCaps {
    fn default() -> Self {
        Self { all_scope: DEFAULT_ALL_SCOPE_CAP, table_scope: DEFAULT_TABLE_SCOPE_CAP }
    }
}

impl AggregateCaps {
    fn for_scope(&self, scope: &SearchScope) -> usize {
        match scope {
            SearchScope::All => self.all_scope,
            SearchScope::Table { .. } => self.table_scope,
        }
    }
}

/// Merge raw task output into the final ordered, bounded result set.
///
/// Ordering is a stable sort by (source id, table name, row index), so the
/// result is deterministic regardless of task completion order. Totals and
/// per-table counts come from the untruncated counts each task reports,
/// never from the truncated sequence.
pub fn merge(
    raw: Vec<TableHits>,
    scope: SearchScope,
    caps: &AggregateCaps,
    elapsed: Duration,
    stale: bool,
) -> SearchResultSet {
    let cap = caps.for_scope(&scope);

    let mut table_counts: Vec<TableMatchCount> = raw
        .iter()
        .filter(|hits| hits.matched > 0)
        .map(|hits| TableMatchCount {
            source_id: hits.source_id.clone(),
            table: hits.table.clone(),
            matched: hits.matched,
        })
        .collect();
    table_counts.sort_by(|a, b| (&a.source_id, &a.table).cmp(&(&b.source_id, &b.table)));

    let total_matches: usize = raw.iter().map(|hits| hits.matched).sum();

    let mut matches: Vec<_> = raw.into_iter().flat_map(|hits| hits.hits).collect();
    matches.sort_by(|a, b| {
        (&a.source_id, &a.table, a.row_index).cmp(&(&b.source_id, &b.table, b.row_index))
    });
    matches.truncate(cap);

    SearchResultSet { matches, total_matches, table_counts, elapsed, scope, stale }
}
