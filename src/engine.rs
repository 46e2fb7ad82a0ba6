//! Engine facade: loads, searches, and session lifecycle in one place.
//!
//! The engine wires the table cache, source registry, search executor, and
//! session gateway together behind the operations a host (CLI, UI) calls.
//! All handles are `Arc`-shared internally, so the engine is `Clone` and a
//! search can be driven from another thread via [`SearchHandle`] without
//! blocking the caller's own loop.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Utc;

use crate::cache::{CacheConfig, CachedTable, TableCache};
use crate::models::{
    SearchResultSet, SearchScope, Source, SourceKind, TablePayload,
};
use crate::registry::{FsProbe, ReachabilityProbe, SourceRegistry};
use crate::search::{
    AggregateCaps, CancelToken, SearchError, SearchExecutor, SearchOptions, merge,
};
use crate::session::gateway::DEFAULT_DEBOUNCE;
use crate::session::{PersistedSession, SessionGateway};

/// One source's decoded payload, handed in by the host's format-specific
/// loaders.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub id: String,
    pub display_name: String,
    pub kind: SourceKind,
    pub tables: Vec<TablePayload>,
}

#[derive(Clone)]
pub struct EngineConfig {
    /// Session file location; `None` uses the platform default
    pub session_path: Option<PathBuf>,
    pub cache: CacheConfig,
    pub search: SearchOptions,
    pub caps: AggregateCaps,
    /// Wall-clock budget applied to every search; `None` means unbounded
    pub search_timeout: Option<Duration>,
    pub debounce: Duration,
    /// Reachability probe; `None` uses the filesystem existence check
    pub probe: Option<Arc<dyn ReachabilityProbe>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_path: None,
            cache: CacheConfig::default(),
            search: SearchOptions::default(),
            caps: AggregateCaps::default(),
            search_timeout: None,
            debounce: DEFAULT_DEBOUNCE,
            probe: None,
        }
    }
}

/// In-flight search spawned off the caller's thread. Poll it from an event
/// loop or wait synchronously; drop the handle to abandon the result.
pub struct SearchHandle {
    receiver: Receiver<Result<SearchResultSet, SearchError>>,
    cancel: CancelToken,
}

impl SearchHandle {
    /// Non-blocking: `None` while the search is still running
    pub fn poll(&self) -> Option<Result<SearchResultSet, SearchError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(SearchError::Cancelled)),
        }
    }

    /// Block until the search finishes
    pub fn wait(self) -> Result<SearchResultSet, SearchError> {
        self.receiver.recv().unwrap_or(Err(SearchError::Cancelled))
    }

    /// Signal cancellation; in-flight tasks stop at their next row batch
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

#[derive(Clone)]
pub struct Engine {
    cache: Arc<TableCache>,
    registry: Arc<SourceRegistry>,
    gateway: Arc<SessionGateway>,
    executor: Arc<SearchExecutor>,
    recents: Arc<Mutex<Vec<String>>>,
    caps: AggregateCaps,
    search_timeout: Option<Duration>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let session_path = match config.session_path {
            Some(path) => path,
            None => SessionGateway::default_path()?,
        };
        let probe: Arc<dyn ReachabilityProbe> =
            config.probe.unwrap_or_else(|| Arc::new(FsProbe));
        Ok(Self {
            cache: Arc::new(TableCache::new(config.cache)),
            registry: Arc::new(SourceRegistry::new(probe)),
            gateway: Arc::new(SessionGateway::new(session_path, config.debounce)),
            executor: Arc::new(SearchExecutor::new(&config.search)?),
            recents: Arc::new(Mutex::new(Vec::new())),
            caps: config.caps,
            search_timeout: config.search_timeout,
        })
    }

    /// Load (or reload) one source from decoded payloads: populate the
    /// cache, upsert the registry entry, and schedule a session save.
    ///
    /// A payload that fails to normalize fails the whole load for this
    /// source; tables already cached for it are evicted again so a failed
    /// load leaves no half-loaded source behind. Other sources and
    /// in-flight searches are unaffected.
    pub fn load_source(&self, input: SourceInput) -> Result<Source> {
        let mut table_names = Vec::with_capacity(input.tables.len());
        for payload in input.tables {
            let name = payload.name.clone();
            if let Err(e) = self.cache.put(&input.id, payload) {
                self.cache.evict_source(&input.id);
                return Err(e);
            }
            table_names.push(name);
        }

        let source = Source {
            id: input.id,
            display_name: input.display_name,
            kind: input.kind,
            loaded_at: Utc::now(),
            tables: table_names,
        };
        self.registry.register(source.clone());
        crate::session::model::push_recent(&mut self.lock_recents(), &source.id);
        self.gateway.schedule_save(self.session_snapshot());
        Ok(source)
    }

    /// Unload a source: drop it from the registry, evict all its cached
    /// tables, and schedule a session save. No-op for unknown ids.
    pub fn unload_source(&self, source_id: &str) {
        if self.registry.unregister(source_id).is_some() {
            self.cache.evict_source(source_id);
            self.gateway.schedule_save(self.session_snapshot());
        }
    }

    /// Insertion-ordered view of the loaded sources
    pub fn list_sources(&self) -> Vec<Source> {
        self.registry.list()
    }

    /// Search every table of every loaded source
    pub fn search_all(&self, term: &str) -> Result<SearchResultSet, SearchError> {
        self.search_with(term, SearchScope::All, &CancelToken::new(), self.search_timeout)
    }

    /// Search one table of one source. An unknown (source, table) pair
    /// yields an empty result set, not an error.
    pub fn search_scoped(
        &self,
        term: &str,
        source_id: &str,
        table: &str,
    ) -> Result<SearchResultSet, SearchError> {
        let scope =
            SearchScope::Table { source_id: source_id.to_string(), table: table.to_string() };
        self.search_with(term, scope, &CancelToken::new(), self.search_timeout)
    }

    /// Search with an explicit cancellation token and timeout. Cancelled or
    /// timed-out searches return an error and no partial results.
    pub fn search_with(
        &self,
        term: &str,
        scope: SearchScope,
        cancel: &CancelToken,
        timeout: Option<Duration>,
    ) -> Result<SearchResultSet, SearchError> {
        let started = Instant::now();
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }
        // Blank terms match nothing rather than everything
        if term.trim().is_empty() {
            return Ok(SearchResultSet::empty(scope, started.elapsed()));
        }

        let tables = self.tables_in_scope(&scope);
        if tables.is_empty() {
            return Ok(SearchResultSet::empty(scope, started.elapsed()));
        }
        self.search_snapshots(term, &tables, scope, cancel, timeout, started)
    }

    /// Executor pass over already-captured snapshots, then merge. The
    /// staleness check compares against whatever the cache holds at merge
    /// time, not at capture time.
    fn search_snapshots(
        &self,
        term: &str,
        tables: &[Arc<CachedTable>],
        scope: SearchScope,
        cancel: &CancelToken,
        timeout: Option<Duration>,
        started: Instant,
    ) -> Result<SearchResultSet, SearchError> {
        let deadline = timeout.map(|t| started + t);
        let raw = self.executor.run(term, tables, cancel, deadline)?;

        // A table replaced or evicted during the scan makes the result stale
        let stale = raw.iter().any(|hits| {
            self.cache.current_version(&hits.source_id, &hits.table) != Some(hits.version)
        });

        Ok(merge(raw, scope, &self.caps, started.elapsed(), stale))
    }

    /// Run a search on a background thread; the caller polls or waits on
    /// the returned handle instead of blocking its own loop.
    pub fn spawn_search(&self, term: &str, scope: SearchScope) -> SearchHandle {
        let (sender, receiver) = channel();
        let cancel = CancelToken::new();
        let engine = self.clone();
        let term = term.to_string();
        let token = cancel.clone();
        let timeout = self.search_timeout;
        thread::spawn(move || {
            let result = engine.search_with(&term, scope, &token, timeout);
            // Receiver may be gone; an abandoned result is fine
            let _ = sender.send(result);
        });
        SearchHandle { receiver, cancel }
    }

    /// Read and validate the durable session, prune unreachable entries,
    /// and adopt its recents list. Restored sources are descriptors only;
    /// the host re-loads their data through its decoders.
    pub fn restore_session(&self) -> PersistedSession {
        let (session, pruned) = self.gateway.load(self.registry.probe().as_ref());
        if pruned > 0 {
            eprintln!("Restored session: {pruned} unreachable entries removed");
        }
        *self.lock_recents() = session.recent_ids.clone();
        session
    }

    /// Synchronously persist the current registry and recents
    pub fn save_session(&self) -> Result<()> {
        self.gateway.save_now(&self.session_snapshot())
    }

    /// Forget the persisted source list and recently-opened history.
    /// Sources loaded in this process stay loaded; the next successful
    /// load re-persists them.
    pub fn clear_history(&self) -> Result<()> {
        self.lock_recents().clear();
        self.gateway.save_now(&PersistedSession::empty())
    }

    /// Most-recently-opened identifiers, newest first
    pub fn recent_ids(&self) -> Vec<String> {
        self.lock_recents().clone()
    }

    /// Best-effort cache memory usage in bytes
    pub fn memory_estimate(&self) -> usize {
        self.cache.memory_estimate()
    }

    fn session_snapshot(&self) -> PersistedSession {
        let mut session = PersistedSession::empty();
        // Connection-backed sources cannot be re-validated from a path, so
        // only file-backed sources persist across restarts
        session.sources = self
            .registry
            .list()
            .iter()
            .filter(|s| s.kind.is_file_backed())
            .map(Into::into)
            .collect();
        session.recent_ids = self.lock_recents().clone();
        session
    }

    fn tables_in_scope(&self, scope: &SearchScope) -> Vec<Arc<CachedTable>> {
        match scope {
            SearchScope::All => {
                let mut tables = Vec::new();
                for source in self.registry.list() {
                    for name in &source.tables {
                        if let Some(table) = self.cache.get(&source.id, name) {
                            tables.push(table);
                        }
                    }
                }
                tables
            }
            SearchScope::Table { source_id, table } => {
                self.cache.get(source_id, table).into_iter().collect()
            }
        }
    }

    fn lock_recents(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.recents.lock().unwrap_or_else(|e| e.into_inner())
    }
}
