//! Versioned table cache with LRU eviction and memory accounting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::cache::table::CachedTable;
use crate::models::TablePayload;

/// Default memory ceiling before LRU eviction kicks in (bytes)
pub const DEFAULT_MEMORY_CEILING: usize = 500 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub memory_ceiling: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { memory_ceiling: DEFAULT_MEMORY_CEILING }
    }
}

type TableKey = (String, String);

struct CacheEntry {
    table: Arc<CachedTable>,
    /// LRU tick of the last `get` or `put`
    last_access: AtomicU64,
}

struct CacheInner {
    entries: HashMap<TableKey, CacheEntry>,
    /// Last version of tables that were evicted or unloaded, so a re-put
    /// continues the counter instead of restarting at 1
    retired_versions: HashMap<TableKey, u64>,
}

/// Owns every in-memory table snapshot, keyed by (source id, table name).
///
/// Mutation (put/evict) takes the write lock briefly; readers take the read
/// lock only long enough to clone an `Arc` handle, so unrelated searches
/// are never serialized against each other. Snapshot contents are immutable;
/// replacement publishes a new `Arc` with a bumped version.
pub struct TableCache {
    inner: RwLock<CacheInner>,
    tick: AtomicU64,
    mem_bytes: AtomicUsize,
    memory_ceiling: usize,
}

impl TableCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                retired_versions: HashMap::new(),
            }),
            tick: AtomicU64::new(0),
            mem_bytes: AtomicUsize::new(0),
            memory_ceiling: config.memory_ceiling,
        }
    }

    /// Store or replace a table. Kind inference and numeric narrowing run
    /// outside the lock; the replacing snapshot gets `old version + 1`.
    pub fn put(&self, source_id: &str, payload: TablePayload) -> Result<Arc<CachedTable>> {
        let mut table = CachedTable::build(source_id, payload)?;
        let key: TableKey = (source_id.to_string(), table.name.clone());
        let bytes = table.byte_estimate();

        let arc = {
            let mut inner = self.write_inner();
            let live = inner.entries.get(&key).map(|e| e.table.version).unwrap_or(0);
            let retired = inner.retired_versions.get(&key).copied().unwrap_or(0);
            table.version = live.max(retired) + 1;

            let arc = Arc::new(table);
            let entry =
                CacheEntry { table: arc.clone(), last_access: AtomicU64::new(self.next_tick()) };
            if let Some(old) = inner.entries.insert(key.clone(), entry) {
                self.mem_bytes.fetch_sub(old.table.byte_estimate(), Ordering::Relaxed);
            }
            self.mem_bytes.fetch_add(bytes, Ordering::Relaxed);
            arc
        };

        self.enforce_ceiling(&key);
        Ok(arc)
    }

    /// O(1), non-blocking lookup returning a read-only snapshot handle
    pub fn get(&self, source_id: &str, table: &str) -> Option<Arc<CachedTable>> {
        let inner = self.read_inner();
        let entry = inner.entries.get(&(source_id.to_string(), table.to_string()))?;
        entry.last_access.store(self.next_tick(), Ordering::Relaxed);
        Some(entry.table.clone())
    }

    /// Current version without touching LRU recency; used for staleness checks
    pub fn current_version(&self, source_id: &str, table: &str) -> Option<u64> {
        let inner = self.read_inner();
        inner.entries.get(&(source_id.to_string(), table.to_string())).map(|e| e.table.version)
    }

    /// Remove one table; no-op when absent
    pub fn evict(&self, source_id: &str, table: &str) {
        let mut inner = self.write_inner();
        let key = (source_id.to_string(), table.to_string());
        Self::remove_entry(&mut inner, &key, &self.mem_bytes);
    }

    /// Remove every table belonging to a source; used when unregistering
    pub fn evict_source(&self, source_id: &str) {
        let mut inner = self.write_inner();
        let keys: Vec<TableKey> =
            inner.entries.keys().filter(|(sid, _)| sid == source_id).cloned().collect();
        for key in keys {
            Self::remove_entry(&mut inner, &key, &self.mem_bytes);
        }
    }

    /// Best-effort byte accounting for diagnostics and eviction heuristics
    pub fn memory_estimate(&self) -> usize {
        self.mem_bytes.load(Ordering::Relaxed)
    }

    pub fn table_count(&self) -> usize {
        self.read_inner().entries.len()
    }

    /// Snapshot handles for every cached table, unordered
    pub fn snapshot_all(&self) -> Vec<Arc<CachedTable>> {
        let inner = self.read_inner();
        let tick = self.next_tick();
        inner
            .entries
            .values()
            .map(|e| {
                e.last_access.store(tick, Ordering::Relaxed);
                e.table.clone()
            })
            .collect()
    }

    /// Evict least-recently-accessed tables until back under the ceiling.
    ///
    /// The just-written key and zero-row tables are exempt. Readers holding
    /// snapshot `Arc`s are unaffected; they finish against the version they
    /// captured and the result is flagged stale.
    fn enforce_ceiling(&self, keep: &TableKey) {
        while self.mem_bytes.load(Ordering::Relaxed) > self.memory_ceiling {
            let mut inner = self.write_inner();
            let victim = inner
                .entries
                .iter()
                .filter(|(key, entry)| **key != *keep && entry.table.row_count > 0)
                .min_by_key(|(_, entry)| entry.last_access.load(Ordering::Relaxed))
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => Self::remove_entry(&mut inner, &key, &self.mem_bytes),
                None => break,
            }
        }
    }

    fn remove_entry(inner: &mut CacheInner, key: &TableKey, mem: &AtomicUsize) {
        if let Some(old) = inner.entries.remove(key) {
            mem.fetch_sub(old.table.byte_estimate(), Ordering::Relaxed);
            inner.retired_versions.insert(key.clone(), old.table.version);
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, CacheInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
