//! # hs-ontology: Ontology Query Composition and Result Decoding
//!
//! Answers questions about biomedical entities (assay types, genes, proteins,
//! cell types, organs, field mappings) stored in a Concept/Code/Term
//! knowledge graph. Properties of an entity are multi-hop paths rather than
//! attributes, so every resource family is a composition of reusable
//! subquery fragments, executed once and decoded into nested domain objects.
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `GraphBackend` is the contract between composition and the engine
//! 2. **Text is pure**: query text depends only on configuration; user input is bound
//! 3. **Decoding is total**: malformed delimited strings degrade to empty fields
//! 4. **Request-scoped**: no mutable state shared between requests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hs_ontology::{GraphHandle, OntologyConfig, OntologyService, ResourceFamily};
//! use hs_ontology::storage::MemoryBackend;
//!
//! # async fn example() -> hs_ontology::Result<()> {
//! let config = OntologyConfig::default();
//! let graph = GraphHandle::connect(MemoryBackend::new(), config.timeout()).await?;
//! let service = OntologyService::new(graph, config)?;
//!
//! let assay_types = service
//!     .compose_and_run(ResourceFamily::AssayTypes, &Default::default())
//!     .await?;
//! for item in &assay_types {
//!     println!("{}", item.to_json());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (default) | Scripted fixtures for testing |
//! | Bolt | `bolt` | Connect to external Neo4j via Bolt protocol |

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod cypher;
pub mod execution;
pub mod session;
pub mod storage;
pub mod decode;
pub mod pagination;
pub mod assemble;
pub mod resources;
pub mod service;
pub mod config;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{Direction, DomainObject, DomainValue, PropertyMap, RelType, Value};

// ============================================================================
// Re-exports: Composition and execution
// ============================================================================

pub use cypher::{ComposedQuery, Filter, PropertyFragment, QueryComposer, QueryKind, Seed};
pub use execution::{ExecutionState, ExecutionStats, QueryResult, ResultRow};
pub use session::{Session, SessionId};
pub use storage::{BackendConfig, GraphBackend};

// ============================================================================
// Re-exports: Service layer
// ============================================================================

pub use config::OntologyConfig;
pub use pagination::{PageRequest, PageResult, PageSelector};
pub use resources::{ResourceDescriptor, ResourceFamily};
pub use service::{NamedFilters, OntologyService};

// ============================================================================
// Top-level Graph handle
// ============================================================================

/// The process-wide handle to the graph engine.
///
/// Shared read-only by every request; each call leases its own session.
/// Cloning is cheap.
pub struct GraphHandle<B: GraphBackend> {
    backend: Arc<B>,
    timeout: Duration,
    closed: Arc<AtomicBool>,
}

impl<B: GraphBackend> Clone for GraphHandle<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            timeout: self.timeout,
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<B: GraphBackend> GraphHandle<B> {
    /// Wrap a backend and prove it is reachable.
    pub async fn connect(backend: B, timeout: Duration) -> Result<Self> {
        let handle = Self::with_backend(backend, timeout);
        handle.ping().await?;
        info!(timeout_ms = timeout.as_millis() as u64, "graph handle connected");
        Ok(handle)
    }

    /// Wrap a backend without a connectivity check.
    pub fn with_backend(backend: B, timeout: Duration) -> Self {
        Self {
            backend: Arc::new(backend),
            timeout,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        self.ensure_open()?;
        match tokio::time::timeout(self.timeout, self.backend.verify_connectivity()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Unavailable("connectivity check timed out".into())),
        }
    }

    /// Execute one composed statement on a fresh session, bounded by the
    /// per-call timeout. The session is released on every path.
    pub async fn run(&self, query: &ComposedQuery) -> Result<QueryResult> {
        self.ensure_open()?;
        let session = self.backend.open_session().await?;
        let session_id = session.id();
        let started = Instant::now();
        debug!(session = %session_id, kind = ?query.kind, "executing composed query");

        let outcome = tokio::time::timeout(
            self.timeout,
            self.backend.run(&session, &query.text, &query.params, &query.columns),
        )
        .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if let Err(e) = self.backend.close_session(session).await {
            warn!(session = %session_id, error = %e, "failed to release session");
        }

        let timeout_ms = self.timeout.as_millis() as u64;
        match outcome {
            Ok(Ok(mut result)) => {
                result.stats.state = ExecutionState::Completed;
                result.stats.rows_returned = result.rows.len() as u64;
                result.stats.execution_time_ms = elapsed_ms;
                debug!(session = %session_id, rows = result.rows.len(), elapsed_ms, "query completed");
                Ok(result)
            }
            Ok(Err(Error::Timeout { .. })) | Err(_) => {
                warn!(session = %session_id, timeout_ms, "query timed out");
                Err(Error::Timeout { timeout_ms })
            }
            Ok(Err(e)) => {
                warn!(session = %session_id, error = %e, "query failed");
                Err(e)
            }
        }
    }

    /// Refuse further work and shut the backend down.
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("closing graph handle");
        self.backend.shutdown().await
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Unavailable("graph handle is closed".into()))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Composition could not be built: missing root code or vocabulary,
    /// bad alias, or a statement the engine rejected.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The engine did not answer within the per-call timeout.
    #[error("Query exceeded the {timeout_ms} ms timeout")]
    Timeout { timeout_ms: u64 },

    /// No entity matched.
    #[error("No results: {0}")]
    Empty(String),

    /// Caller input rejected before any graph call.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The engine could not be reached.
    #[error("Graph unavailable: {0}")]
    Unavailable(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::ScriptedFailure;
    use crate::storage::MemoryBackend;

    fn query(text: &str) -> ComposedQuery {
        ComposedQuery {
            text: text.into(),
            params: PropertyMap::new(),
            columns: vec!["n".into()],
            correlation_variable: "x".into(),
            kind: QueryKind::Rows,
        }
    }

    #[tokio::test]
    async fn test_run_releases_session() {
        let backend = MemoryBackend::new();
        backend.on(["RETURN n"], vec![ResultRow::new().with("n", 1)]);
        let graph = GraphHandle::connect(backend.clone(), Duration::from_secs(1)).await.unwrap();
        let r = graph.run(&query("RETURN n")).await.unwrap();
        assert_eq!(r.stats.rows_returned, 1);
        assert_eq!(r.stats.state, ExecutionState::Completed);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_slow_query_times_out() {
        let backend = MemoryBackend::new();
        backend.set_latency(Some(Duration::from_millis(200)));
        let graph = GraphHandle::with_backend(backend.clone(), Duration::from_millis(20));
        let err = graph.run(&query("RETURN n")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 20 }));
        assert_eq!(backend.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_engine_timeout_reports_configured_limit() {
        let backend = MemoryBackend::new();
        backend.fail_on(["RETURN"], ScriptedFailure::Timeout);
        let graph = GraphHandle::with_backend(backend, Duration::from_millis(1500));
        let err = graph.run(&query("RETURN n")).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 1500 }));
    }

    #[tokio::test]
    async fn test_closed_handle_refuses_work() {
        let graph = GraphHandle::with_backend(MemoryBackend::new(), Duration::from_secs(1));
        graph.close().await.unwrap();
        assert!(matches!(graph.run(&query("RETURN n")).await, Err(Error::Unavailable(_))));
    }
}
