//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use tempfile::TempDir;

use tablescope::models::Value;
use tablescope::{
    Engine, EngineConfig, ReachabilityProbe, SourceInput, SourceKind, TablePayload,
};

/// Probe that treats a fixed set of identifiers as reachable
pub struct StaticProbe {
    reachable: HashSet<String>,
}

impl StaticProbe {
    pub fn new(ids: &[&str]) -> Self {
        Self { reachable: ids.iter().map(|s| s.to_string()).collect() }
    }
}

impl ReachabilityProbe for StaticProbe {
    fn is_reachable(&self, id: &str, _kind: SourceKind) -> bool {
        self.reachable.contains(id)
    }
}

/// Probe that accepts everything
pub struct AllReachable;

impl ReachabilityProbe for AllReachable {
    fn is_reachable(&self, _id: &str, _kind: SourceKind) -> bool {
        true
    }
}

/// An engine wired to a temp-dir session file; the temp dir must outlive
/// the engine
pub struct TestEngine {
    pub engine: Engine,
    pub session_dir: TempDir,
}

/// Build an engine with a private session file and the given probe
pub fn engine_with(probe: Arc<dyn ReachabilityProbe>, config: EngineConfig) -> TestEngine {
    let session_dir = TempDir::new().expect("Failed to create temp dir");
    let engine = Engine::new(EngineConfig {
        session_path: Some(session_dir.path().join("session.json")),
        probe: Some(probe),
        ..config
    })
    .expect("Failed to build engine");
    TestEngine { engine, session_dir }
}

pub fn engine() -> TestEngine {
    engine_with(Arc::new(AllReachable), EngineConfig::default())
}

/// Builder for decoded table payloads
pub struct TableBuilder {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), columns: Vec::new(), rows: Vec::new() }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Add `count` rows of a single repeated text cell
    pub fn repeated_text_rows(mut self, text: &str, count: usize) -> Self {
        for _ in 0..count {
            self.rows.push(vec![Value::Text(text.to_string())]);
        }
        self
    }

    pub fn build(self) -> TablePayload {
        let columns: Vec<&str> = self.columns.iter().map(|c| c.as_str()).collect();
        TablePayload::from_rows(&self.name, &columns, self.rows)
    }
}

/// A delimited-text source input with the given tables
pub fn source_input(id: &str, tables: Vec<TablePayload>) -> SourceInput {
    SourceInput {
        id: id.to_string(),
        display_name: id.rsplit('/').next().unwrap_or(id).to_string(),
        kind: SourceKind::DelimitedText,
        tables,
    }
}

/// Small two-table fixture: employees + orders, both containing "Ann"
pub fn staff_source(id: &str) -> SourceInput {
    source_input(
        id,
        vec![
            TableBuilder::new("employees")
                .columns(&["name", "age"])
                .row(vec![Value::Text("Ann".into()), Value::Int(30)])
                .row(vec![Value::Text("Bob".into()), Value::Int(41)])
                .build(),
            TableBuilder::new("orders")
                .columns(&["customer", "count"])
                .row(vec![Value::Text("Ann".into()), Value::Int(5)])
                .build(),
        ],
    )
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
