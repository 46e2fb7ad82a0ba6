/// Session persistence integration tests: save, restore, prune, history
mod common;

use std::sync::Arc;

use tablescope::{Engine, EngineConfig, ReachabilityProbe};

use common::{AllReachable, StaticProbe, engine, staff_source};

/// Second engine sharing the first one's session file, as after a restart
fn reopen(t: &common::TestEngine, probe: Arc<dyn ReachabilityProbe>) -> Engine {
    Engine::new(EngineConfig {
        session_path: Some(t.session_dir.path().join("session.json")),
        probe: Some(probe),
        ..EngineConfig::default()
    })
    .expect("Failed to build engine")
}

#[test]
fn test_save_and_restore_round_trips_registry() {
    let t = engine();
    t.engine.load_source(staff_source("/data/a.csv")).unwrap();
    t.engine.load_source(staff_source("/data/b.csv")).unwrap();
    t.engine.save_session().unwrap();

    let restarted = reopen(&t, Arc::new(AllReachable));
    let session = restarted.restore_session();

    let ids: Vec<_> = session.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["/data/a.csv", "/data/b.csv"], "same identifiers, same order");
    assert_eq!(session.sources[0].tables, vec!["employees", "orders"]);
}

#[test]
fn test_restore_prunes_unreachable_entries() {
    let t = engine();
    t.engine.load_source(staff_source("/data/alive.csv")).unwrap();
    t.engine.load_source(staff_source("/data/deleted.csv")).unwrap();
    t.engine.save_session().unwrap();

    // After "restart" only one backing file still exists
    let probe = Arc::new(StaticProbe::new(&["/data/alive.csv"]));
    let restarted = reopen(&t, probe.clone());
    let session = restarted.restore_session();

    assert_eq!(session.sources.len(), 1);
    assert_eq!(session.sources[0].id, "/data/alive.csv");
    assert_eq!(session.recent_ids, vec!["/data/alive.csv"]);

    // The durable record was re-saved pruned: a fresh load sees no dead entry
    let again = reopen(&t, Arc::new(AllReachable));
    let session = again.restore_session();
    assert_eq!(session.sources.len(), 1);
    assert_eq!(session.sources[0].id, "/data/alive.csv");
}

#[test]
fn test_recent_ids_are_mru_ordered_deduped_and_capped() {
    let t = engine();
    for i in 0..12 {
        t.engine.load_source(staff_source(&format!("/data/s{i}.csv"))).unwrap();
    }
    // Re-open an old one; it moves to the front without duplicating
    t.engine.load_source(staff_source("/data/s5.csv")).unwrap();

    let recents = t.engine.recent_ids();
    assert_eq!(recents.len(), 10);
    assert_eq!(recents[0], "/data/s5.csv");
    assert_eq!(recents.iter().filter(|id| *id == "/data/s5.csv").count(), 1);
}

#[test]
fn test_clear_history_forgets_durable_state_only() {
    let t = engine();
    t.engine.load_source(staff_source("/data/a.csv")).unwrap();
    t.engine.save_session().unwrap();

    t.engine.clear_history().unwrap();
    assert!(t.engine.recent_ids().is_empty());
    // Loaded data keeps working in this process
    assert_eq!(t.engine.search_all("ann").unwrap().total_matches, 2);

    let restarted = reopen(&t, Arc::new(AllReachable));
    let session = restarted.restore_session();
    assert!(session.sources.is_empty());
    assert!(session.recent_ids.is_empty());
}

#[test]
fn test_debounced_saves_reach_disk_after_flush() {
    let t = engine();
    // load_source schedules a debounced save; save_session forces it out
    t.engine.load_source(staff_source("/data/a.csv")).unwrap();
    t.engine.save_session().unwrap();

    let restarted = reopen(&t, Arc::new(AllReachable));
    assert_eq!(restarted.restore_session().sources.len(), 1);
}

#[test]
fn test_restore_on_missing_file_is_empty() {
    let t = engine();
    let session = t.engine.restore_session();
    assert!(session.sources.is_empty());
    assert!(session.recent_ids.is_empty());
}

#[test]
fn test_connection_sources_are_not_persisted() {
    use tablescope::SourceKind;

    let t = engine();
    let mut input = staff_source("conn://warehouse");
    input.kind = SourceKind::ExternalConnection;
    t.engine.load_source(input).unwrap();
    t.engine.load_source(staff_source("/data/a.csv")).unwrap();
    t.engine.save_session().unwrap();

    let restarted = reopen(&t, Arc::new(AllReachable));
    let session = restarted.restore_session();
    let ids: Vec<_> = session.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["/data/a.csv"]);
    // The connection is still live and searchable in the original process
    assert_eq!(t.engine.list_sources().len(), 2);
}
