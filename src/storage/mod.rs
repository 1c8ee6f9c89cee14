//! # Graph Backend Trait
//!
//! The contract between the query layer and whatever engine evaluates the
//! composed Cypher text. The service only ever reads, so the contract is
//! small: open a session, run one parameterized statement, close it.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | Scripted fixtures for tests and offline use |
//! | `BoltBackend` | `bolt` | External Neo4j via Bolt protocol |

pub mod memory;
#[cfg(feature = "bolt")]
pub mod bolt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::execution::QueryResult;
use crate::model::PropertyMap;
use crate::session::Session;
use crate::Result;

pub use memory::MemoryBackend;
#[cfg(feature = "bolt")]
pub use bolt::BoltBackend;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Configuration for connecting to a graph backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Scripted in-memory fixtures (no engine).
    #[default]
    Memory,

    /// Neo4j Bolt protocol
    Bolt {
        uri: String,
        user: String,
        password: String,
        #[serde(default)]
        database: Option<String>,
    },
}

// ============================================================================
// GraphBackend Trait
// ============================================================================

/// The read-only execution contract.
///
/// Backends must bind `params` as engine parameters and never splice them
/// into `text`. The columns are the aliases the statement declares, in
/// order; backends use them to pull cells out of engine records.
///
/// Errors:
/// - engine-reported transaction timeout → `Error::Timeout`
/// - statement rejected by the engine → `Error::Configuration`
/// - anything else → `Error::Unavailable`
#[async_trait]
pub trait GraphBackend: Send + Sync + 'static {
    /// The session type for this backend.
    type Session: Session;

    /// Open a read session.
    async fn open_session(&self) -> Result<Self::Session>;

    /// Release a session. Called on every path, including failures.
    async fn close_session(&self, session: Self::Session) -> Result<()>;

    /// Execute one statement and materialize every row.
    async fn run(
        &self,
        session: &Self::Session,
        text: &str,
        params: &PropertyMap,
        columns: &[String],
    ) -> Result<QueryResult>;

    /// Cheap round trip to prove the engine is reachable.
    async fn verify_connectivity(&self) -> Result<()> {
        let session = self.open_session().await?;
        self.close_session(session).await
    }

    /// Shut down the backend, dropping pooled connections.
    async fn shutdown(&self) -> Result<()>;
}
