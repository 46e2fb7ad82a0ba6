//! Data models for the multi-source table corpus.
//!
//! This module defines the data structures shared across the engine:
//!
//! - [`Source`] - One loaded file or connection, possibly holding several tables
//! - [`Value`] / [`ScalarKind`] - Dynamic cell values and the inferred column kinds
//! - [`TablePayload`] - Decoded tabular data handed in by format-specific loaders
//! - [`SearchMatch`] / [`SearchResultSet`] - Provenance-tagged search output
//!
//! Persistence-facing models live in [`crate::session`].

pub mod payload;
pub mod search;
pub mod source;
pub mod value;

pub use payload::{TablePayload, TableValues};
pub use search::{SearchMatch, SearchResultSet, SearchScope, TableMatchCount};
pub use source::{Source, SourceKind};
pub use value::{ScalarKind, Value};
