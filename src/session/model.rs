use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Source, SourceKind};

/// Session schema version for invalidation on format changes
pub const SESSION_VERSION: u32 = 1;

/// Most-recently-opened identifiers kept in the session
pub const RECENT_CAP: usize = 10;

/// Durable descriptor for one loaded source. Enough to re-offer the source
/// at startup; the actual data is re-decoded by the host's loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSource {
    pub id: String,
    pub display_name: String,
    pub kind: SourceKind,
    pub tables: Vec<String>,
    pub last_accessed: DateTime<Utc>,
}

impl From<&Source> for PersistedSource {
    fn from(source: &Source) -> Self {
        Self {
            id: source.id.clone(),
            display_name: source.display_name.clone(),
            kind: source.kind,
            tables: source.tables.clone(),
            last_accessed: source.loaded_at,
        }
    }
}

/// Durable record of the source registry plus recently opened identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub version: u32,
    /// Sources in registry insertion order
    pub sources: Vec<PersistedSource>,
    /// Most-recent-first, deduplicated, capped at [`RECENT_CAP`]
    pub recent_ids: Vec<String>,
}

impl PersistedSession {
    pub fn empty() -> Self {
        Self { version: SESSION_VERSION, sources: Vec::new(), recent_ids: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.recent_ids.is_empty()
    }

    /// Push an identifier to the front of the recents list, deduplicating
    /// and enforcing the cap
    pub fn push_recent(&mut self, id: &str) {
        push_recent(&mut self.recent_ids, id);
    }
}

impl Default for PersistedSession {
    fn default() -> Self {
        Self::empty()
    }
}

/// Shared recents-list update: move-to-front, dedup, cap
pub(crate) fn push_recent(recents: &mut Vec<String>, id: &str) {
    recents.retain(|existing| existing != id);
    recents.insert(0, id.to_string());
    recents.truncate(RECENT_CAP);
}
