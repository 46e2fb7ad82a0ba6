use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of source formats the engine accepts.
///
/// Format-specific decoding happens outside the engine; the kind is kept so
/// reachability validation and the persisted session can treat file-backed
/// and connection-backed sources differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    RelationalFile,
    DelimitedText,
    Spreadsheet,
    SemiStructured,
    ExternalConnection,
}

impl SourceKind {
    /// Short human-readable label for display and log lines
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::RelationalFile => "relational-file",
            SourceKind::DelimitedText => "delimited-text",
            SourceKind::Spreadsheet => "spreadsheet",
            SourceKind::SemiStructured => "semi-structured",
            SourceKind::ExternalConnection => "external-connection",
        }
    }

    /// Whether the identifier is a filesystem path (checkable with an
    /// existence probe) rather than a connection descriptor
    pub fn is_file_backed(&self) -> bool {
        !matches!(self, SourceKind::ExternalConnection)
    }
}

/// One loaded source: a file or connection, possibly containing multiple tables.
///
/// The identifier is unique within the registry; re-loading the same
/// identifier replaces the entry rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier: filesystem path or connection descriptor
    pub id: String,
    pub display_name: String,
    pub kind: SourceKind,
    /// Updated on every successful load, including reloads
    pub loaded_at: DateTime<Utc>,
    /// Ordered table names as reported by the loader
    pub tables: Vec<String>,
}
