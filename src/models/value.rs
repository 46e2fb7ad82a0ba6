use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Dynamic cell value as handed in by format-specific loaders.
///
/// The cache narrows these into typed columnar arrays on `put`; `Value` is
/// the exchange type at the loader boundary and in row snapshots attached
/// to search matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Temporal(DateTime<Utc>),
    Null,
}

/// Inferred scalar kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarKind {
    Integer,
    Float,
    Text,
    Boolean,
    Temporal,
    /// Column with no non-null values
    Null,
}

impl Value {
    pub fn kind(&self) -> ScalarKind {
        match self {
            Value::Int(_) => ScalarKind::Integer,
            Value::Float(_) => ScalarKind::Float,
            Value::Text(_) => ScalarKind::Text,
            Value::Bool(_) => ScalarKind::Boolean,
            Value::Temporal(_) => ScalarKind::Temporal,
            Value::Null => ScalarKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical textual form used for text-column storage and for
    /// substring matching on boolean/temporal columns.
    ///
    /// Returns `None` for null values, which never match.
    pub fn canonical_text(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Text(s) => Some(s.clone()),
            Value::Bool(b) => Some(canonical_bool(*b).to_string()),
            Value::Temporal(t) => Some(canonical_temporal(t)),
            Value::Null => None,
        }
    }
}

/// Canonical boolean rendering, shared by storage and matching
pub fn canonical_bool(b: bool) -> &'static str {
    if b { "true" } else { "false" }
}

/// Canonical temporal rendering: RFC 3339 with second precision, UTC `Z` suffix
pub fn canonical_temporal(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
