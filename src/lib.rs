//! Tablescope - Cache many tabular sources in memory and search them all at once
//!
//! This library keeps every loaded table in a type-optimized columnar cache
//! and runs substring/value searches across all of them in parallel, with
//! provenance-tagged results. It supports:
//!
//! - Loading decoded tables from any source kind (delimited text, spreadsheets,
//!   relational files, semi-structured documents, external connections)
//! - Case-insensitive substring and exact numeric search, scoped to one table
//!   or to everything loaded
//! - Deterministically ordered, bounded result sets with per-table counts
//! - Persisting the loaded-source list across restarts, pruning entries whose
//!   backing file disappeared
//!
//! Format-specific decoding, rendering, and export stay outside this crate;
//! loaders hand in [`models::TablePayload`] values and consume
//! [`models::SearchResultSet`] values.
//!
//! # Example
//!
//! ```no_run
//! use tablescope::{Engine, EngineConfig, SourceInput, SourceKind, TablePayload, Value};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! engine.load_source(SourceInput {
//!     id: "/data/people.csv".into(),
//!     display_name: "people.csv".into(),
//!     kind: SourceKind::DelimitedText,
//!     tables: vec![TablePayload::from_rows(
//!         "people",
//!         &["name", "age"],
//!         vec![vec![Value::Text("Ann".into()), Value::Int(30)]],
//!     )],
//! })?;
//!
//! let results = engine.search_all("ann")?;
//! println!("{} matches", results.total_matches);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod cli;
pub mod engine;
pub mod models;
pub mod registry;
pub mod search;
pub mod session;

// Re-export commonly used types
pub use engine::{Engine, EngineConfig, SearchHandle, SourceInput};
pub use models::{
    SearchMatch, SearchResultSet, SearchScope, Source, SourceKind, TablePayload, Value,
};
pub use registry::{FsProbe, ReachabilityProbe};
pub use search::{CancelToken, SearchError};
pub use session::PersistedSession;
