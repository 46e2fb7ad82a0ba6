//! Source registry: which sources are loaded, their tables, and metadata.
//!
//! The registry is the unit of persistence and the authority for search
//! scope. Reachability checks go through the injectable
//! [`ReachabilityProbe`] so tests and connection-backed sources can supply
//! their own validation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Source, SourceKind};

/// Per-source-kind "is the backing storage still there?" check, used at
/// startup and before any session restore. Must not load data.
pub trait ReachabilityProbe: Send + Sync {
    fn is_reachable(&self, id: &str, kind: SourceKind) -> bool;
}

/// Default probe: filesystem existence for file-backed kinds. Connection
/// descriptors cannot be pinged here, so hosts with external connections
/// inject their own probe.
pub struct FsProbe;

impl ReachabilityProbe for FsProbe {
    fn is_reachable(&self, id: &str, kind: SourceKind) -> bool {
        kind.is_file_backed() && Path::new(id).exists()
    }
}

/// Tracks loaded sources in insertion order, keyed by unique identifier.
pub struct SourceRegistry {
    sources: Mutex<Vec<Source>>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl SourceRegistry {
    pub fn new(probe: Arc<dyn ReachabilityProbe>) -> Self {
        Self { sources: Mutex::new(Vec::new()), probe }
    }

    /// Idempotent upsert keyed by identifier: re-registering replaces the
    /// existing entry in place, preserving its position in the display order.
    pub fn register(&self, source: Source) {
        let mut sources = self.lock();
        match sources.iter_mut().find(|s| s.id == source.id) {
            Some(existing) => *existing = source,
            None => sources.push(source),
        }
    }

    /// Remove a source; the caller cascades cache eviction. Returns the
    /// removed entry, `None` when the id was not registered.
    pub fn unregister(&self, id: &str) -> Option<Source> {
        let mut sources = self.lock();
        let idx = sources.iter().position(|s| s.id == id)?;
        Some(sources.remove(idx))
    }

    /// Insertion-ordered snapshot for display; search scope ordering is
    /// (source id, table name, row index) and applied by the aggregator
    pub fn list(&self) -> Vec<Source> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Source> {
        self.lock().iter().find(|s| s.id == id).cloned()
    }

    /// Reachability of a registered source's backing storage, without
    /// loading data. Unregistered ids validate as unreachable.
    pub fn validate(&self, id: &str) -> bool {
        match self.get(id) {
            Some(source) => self.probe.is_reachable(id, source.kind),
            None => false,
        }
    }

    pub fn probe(&self) -> Arc<dyn ReachabilityProbe> {
        self.probe.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Source>> {
        self.sources.lock().unwrap_or_else(|e| e.into_inner())
    }
}
