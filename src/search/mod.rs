//! Concurrent search across cached tables.
//!
//! One logical search fans out one task per (source, table) in scope onto a
//! bounded rayon pool. Each task scans its own immutable snapshot, so tasks
//! share no mutable state and need no locking. The aggregator then merges
//! partial results into one deterministically ordered, bounded result set.

pub mod aggregate;
pub mod executor;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

pub use aggregate::{AggregateCaps, merge};
pub use executor::{SearchExecutor, SearchOptions, TableHits};

/// Reasons a search returns no result at all. Distinct from "no matches",
/// which is an ordinary empty result set, so callers can decide to retry.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    /// The caller cancelled; partial results are discarded
    #[error("search cancelled")]
    Cancelled,
    /// The wall-clock budget expired; behaves like cancellation
    #[error("search timed out")]
    TimedOut,
}

/// Shareable cancellation signal. Tasks observe it between row batches and
/// stop early; they are never forcibly killed mid-read.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
