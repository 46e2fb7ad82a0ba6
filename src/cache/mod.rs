//! In-memory, type-optimized table cache.
//!
//! Each loaded (source, table) pair is held as one immutable [`CachedTable`]
//! snapshot behind an `Arc`. Replacement publishes a new snapshot with a
//! bumped version; it never edits in place. That is what makes concurrent
//! reads during eviction safe: a search holding an old snapshot keeps
//! reading consistent old data even if the cache entry is replaced or
//! evicted underneath it.
//!
//! On `put`, column scalar kinds are inferred by majority vote over sampled
//! values and numeric columns are narrowed to the smallest exact-fitting
//! representation (i8/i16/i32/i64, f32/f64) to bound memory.

pub mod infer;
pub mod store;
pub mod table;

pub use store::{CacheConfig, TableCache};
pub use table::{CachedTable, ColumnData, ColumnDef};
