//! Session management.
//!
//! Every query runs on its own session leased from the backend. Sessions are
//! read-only: the service never writes to the knowledge graph.

use serde::{Deserialize, Serialize};

/// Opaque session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Session trait that all backends must implement.
pub trait Session: Send + Sync {
    fn id(&self) -> SessionId;

    /// Target database, if the backend distinguishes several.
    fn database(&self) -> Option<&str> {
        None
    }
}
