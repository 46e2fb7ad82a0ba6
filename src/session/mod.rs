//! Persisted sessions: which sources were loaded, restored across restarts.
//!
//! The session is a human-readable JSON document at a user-scoped location
//! (`<config dir>/tablescope/session.json` by default). Writes are atomic
//! (temp file + rename) and debounced so rapid successive loads coalesce
//! into one write. On load, every entry is validated through the
//! reachability probe and dead entries are pruned and re-saved, so the
//! durable record never re-offers an unreachable source.

pub mod gateway;
pub mod model;

pub use gateway::SessionGateway;
pub use model::{PersistedSession, PersistedSource, RECENT_CAP, SESSION_VERSION};
