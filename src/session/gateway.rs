//! Session persistence: debounced atomic writes, validated loads.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::registry::ReachabilityProbe;
use crate::session::model::{PersistedSession, SESSION_VERSION};

const SESSION_FILENAME: &str = "session.json";

/// Default debounce window for coalescing rapid successive saves
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Default)]
struct DebounceState {
    /// Latest snapshot waiting to be written; later saves replace it
    pending: Option<PersistedSession>,
    /// Whether a background writer thread is currently draining `pending`
    writer_active: bool,
}

/// Writes and restores the persisted session document.
///
/// `schedule_save` is fire-and-forget and debounced; `save_now`/`flush` are
/// synchronous. A failed background write is reported as a warning and the
/// in-memory state stays authoritative for the current process.
pub struct SessionGateway {
    path: PathBuf,
    window: Duration,
    state: Arc<Mutex<DebounceState>>,
    /// Serializes every disk write. Pending snapshots are taken inside this
    /// lock, so a background write that lost the race to a synchronous save
    /// can never land an older snapshot over a newer one.
    disk: Arc<Mutex<()>>,
}

impl SessionGateway {
    pub fn new(path: PathBuf, window: Duration) -> Self {
        Self {
            path,
            window,
            state: Arc::new(Mutex::new(DebounceState::default())),
            disk: Arc::new(Mutex::new(())),
        }
    }

    /// Default user-scoped session location:
    /// `<platform config dir>/tablescope/session.json`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("Failed to get platform config directory")?;
        Ok(base.join("tablescope").join(SESSION_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a snapshot for writing. Writes happen on a background thread
    /// after the debounce window; snapshots scheduled within one window
    /// coalesce into a single write of the latest state.
    pub fn schedule_save(&self, session: PersistedSession) {
        let mut state = lock_state(&self.state);
        state.pending = Some(session);
        if state.writer_active {
            return;
        }
        state.writer_active = true;
        drop(state);

        let shared = self.state.clone();
        let disk = self.disk.clone();
        let path = self.path.clone();
        let window = self.window;
        thread::spawn(move || {
            loop {
                thread::sleep(window);
                let _guard = lock_disk(&disk);
                let taken = {
                    let mut state = lock_state(&shared);
                    match state.pending.take() {
                        Some(session) => session,
                        None => {
                            state.writer_active = false;
                            return;
                        }
                    }
                };
                if let Err(e) = write_atomic(&path, &taken) {
                    eprintln!("Warning: Failed to persist session: {e:#}");
                }
            }
        });
    }

    /// Synchronous write of the given snapshot, superseding anything pending
    pub fn save_now(&self, session: &PersistedSession) -> Result<()> {
        let _guard = lock_disk(&self.disk);
        lock_state(&self.state).pending = None;
        write_atomic(&self.path, session)
    }

    /// Write any pending snapshot immediately
    pub fn flush(&self) -> Result<()> {
        let _guard = lock_disk(&self.disk);
        let pending = lock_state(&self.state).pending.take();
        match pending {
            Some(session) => write_atomic(&self.path, &session),
            None => Ok(()),
        }
    }

    /// Read the durable session, validate every entry through the probe,
    /// and prune dead ones from both the source list and the recents list.
    ///
    /// Returns the pruned session and how many entries were dropped. When
    /// anything was dropped the corrected session is re-saved immediately,
    /// so a later load never re-offers a dead entry. A missing or corrupt
    /// file yields an empty session rather than an error.
    pub fn load(&self, probe: &dyn ReachabilityProbe) -> (PersistedSession, usize) {
        let mut session = match self.read_file() {
            Some(session) => session,
            None => return (PersistedSession::empty(), 0),
        };

        let before = session.sources.len() + session.recent_ids.len();

        // Kinds for recents validation, captured before pruning the list
        let kind_of = |id: &str, session: &PersistedSession| {
            session.sources.iter().find(|s| s.id == id).map(|s| s.kind)
        };
        let recent_kinds: Vec<_> = session
            .recent_ids
            .iter()
            .map(|id| kind_of(id, &session).unwrap_or(crate::models::SourceKind::DelimitedText))
            .collect();

        session.sources.retain(|source| probe.is_reachable(&source.id, source.kind));
        let mut keep = recent_kinds.iter();
        session
            .recent_ids
            .retain(|id| keep.next().is_some_and(|kind| probe.is_reachable(id, *kind)));

        let pruned = before - (session.sources.len() + session.recent_ids.len());
        if pruned > 0 {
            let _guard = lock_disk(&self.disk);
            if let Err(e) = write_atomic(&self.path, &session) {
                eprintln!("Warning: Failed to re-save pruned session: {e:#}");
            }
        }
        (session, pruned)
    }

    fn read_file(&self) -> Option<PersistedSession> {
        if !self.path.exists() {
            return None;
        }
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Warning: Failed to read session file: {e}");
                return None;
            }
        };
        let session: PersistedSession = match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                eprintln!("Warning: Session file is corrupt, starting empty: {e}");
                return None;
            }
        };
        if session.version != SESSION_VERSION {
            eprintln!(
                "Session version mismatch (expected {}, found {}), starting empty",
                SESSION_VERSION, session.version
            );
            return None;
        }
        Some(session)
    }
}

fn lock_state(state: &Arc<Mutex<DebounceState>>) -> MutexGuard<'_, DebounceState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

fn lock_disk(disk: &Arc<Mutex<()>>) -> MutexGuard<'_, ()> {
    disk.lock().unwrap_or_else(|e| e.into_inner())
}

/// Atomic write: temp file in the same directory, then rename over the target
fn write_atomic(path: &Path, session: &PersistedSession) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create session directory")?;
    }
    let json = serde_json::to_string_pretty(session).context("Failed to serialize session")?;
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, json).context("Failed to write session temp file")?;
    fs::rename(&temp, path).context("Failed to rename session temp file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use crate::session::model::PersistedSource;
    use chrono::Utc;
    use std::collections::HashSet;

    struct SetProbe(HashSet<String>);

    impl ReachabilityProbe for SetProbe {
        fn is_reachable(&self, id: &str, _kind: SourceKind) -> bool {
            self.0.contains(id)
        }
    }

    fn persisted(id: &str) -> PersistedSource {
        PersistedSource {
            id: id.to_string(),
            display_name: id.to_string(),
            kind: SourceKind::DelimitedText,
            tables: vec!["t".into()],
            last_accessed: Utc::now(),
        }
    }

    fn gateway_in(dir: &tempfile::TempDir) -> SessionGateway {
        SessionGateway::new(dir.path().join(SESSION_FILENAME), Duration::from_millis(10))
    }

    fn probe_for(ids: &[&str]) -> SetProbe {
        SetProbe(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_save_now_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);

        let mut session = PersistedSession::empty();
        session.sources.push(persisted("a.csv"));
        session.sources.push(persisted("b.csv"));
        session.push_recent("b.csv");
        gateway.save_now(&session).unwrap();

        let (loaded, pruned) = gateway.load(&probe_for(&["a.csv", "b.csv"]));
        assert_eq!(pruned, 0);
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_load_prunes_unreachable_and_resaves() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);

        let mut session = PersistedSession::empty();
        session.sources.push(persisted("gone.csv"));
        session.sources.push(persisted("here.csv"));
        session.push_recent("here.csv");
        session.push_recent("gone.csv");
        gateway.save_now(&session).unwrap();

        let probe = probe_for(&["here.csv"]);
        let (loaded, pruned) = gateway.load(&probe);
        assert_eq!(pruned, 2);
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].id, "here.csv");
        assert_eq!(loaded.recent_ids, vec!["here.csv"]);

        // The durable record no longer re-offers the dead entry
        let (reloaded, pruned_again) = gateway.load(&probe);
        assert_eq!(pruned_again, 0);
        assert_eq!(reloaded, loaded);
    }

    #[test]
    fn test_missing_and_corrupt_files_yield_empty_session() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);
        let probe = probe_for(&[]);

        let (loaded, pruned) = gateway.load(&probe);
        assert!(loaded.is_empty());
        assert_eq!(pruned, 0);

        fs::write(gateway.path(), "{ not json").unwrap();
        let (loaded, _) = gateway.load(&probe);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_version_mismatch_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);
        let mut session = PersistedSession::empty();
        session.version = SESSION_VERSION + 1;
        session.sources.push(persisted("a.csv"));
        // Bypass save_now's version field untouched; write raw
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(gateway.path(), serde_json::to_string(&session).unwrap()).unwrap();

        let (loaded, _) = gateway.load(&probe_for(&["a.csv"]));
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_debounced_saves_coalesce_into_latest() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);

        for i in 0..5 {
            let mut session = PersistedSession::empty();
            session.push_recent(&format!("file-{i}.csv"));
            gateway.schedule_save(session);
        }
        // Wait out the debounce window, then make sure nothing is pending
        thread::sleep(Duration::from_millis(100));
        gateway.flush().unwrap();

        let (loaded, _) = gateway.load(&probe_for(&["file-4.csv"]));
        assert_eq!(loaded.recent_ids, vec!["file-4.csv"]);
    }

    #[test]
    fn test_synchronous_save_wins_over_pending_background_write() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);

        // Land a save_now while the background writer may be mid-cycle; the
        // durable record must never regress to the scheduled snapshot
        for i in 0..20 {
            let mut scheduled = PersistedSession::empty();
            scheduled.push_recent(&format!("scheduled-{i}.csv"));
            gateway.schedule_save(scheduled);
            thread::sleep(Duration::from_millis(5));

            let id = format!("direct-{i}.csv");
            let mut direct = PersistedSession::empty();
            direct.push_recent(&id);
            gateway.save_now(&direct).unwrap();
            thread::sleep(Duration::from_millis(30));

            let (loaded, _) = gateway.load(&probe_for(&[id.as_str()]));
            assert_eq!(loaded.recent_ids, vec![id]);
        }
    }

    #[test]
    fn test_flush_with_nothing_pending_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = gateway_in(&dir);
        gateway.flush().unwrap();
        assert!(!gateway.path().exists());
    }
}
