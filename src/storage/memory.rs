//! In-memory scripted backend.
//!
//! There is no Cypher engine in this crate, so the memory backend does not
//! evaluate statements. It answers them from fixtures: each fixture lists
//! substrings the statement text must contain and the rows (or failure) to
//! return. The first matching fixture wins; no match yields zero rows.
//!
//! ## What it still emulates
//!
//! - Rows are projected onto the declared columns, like an engine would. A
//!   declared column a fixture row lacks comes back null.
//! - A bound `$skip`/`$limit` pair slices the fixture rows.
//! - Every executed statement is logged with its bound parameters, so tests
//!   can assert that user input never reaches the text.
//! - Optional latency, to exercise the timeout path.
//!
//! Use this backend for:
//! - Testing composition, decoding and pagination without a database
//! - Replaying captured responses offline

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::execution::{ExecutionState, ExecutionStats, QueryResult, ResultRow};
use crate::model::*;
use crate::session::{Session, SessionId};
use crate::{Error, Result};
use super::GraphBackend;

// ============================================================================
// Fixtures
// ============================================================================

/// Failure a fixture can inject instead of rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFailure {
    /// The engine reports a transaction timeout.
    Timeout,
    /// The engine rejects the statement.
    Rejected(String),
    /// The engine cannot be reached.
    Unavailable(String),
}

impl ScriptedFailure {
    fn to_error(&self) -> Error {
        match self {
            ScriptedFailure::Timeout => Error::Timeout { timeout_ms: 0 },
            ScriptedFailure::Rejected(msg) => Error::Configuration(msg.clone()),
            ScriptedFailure::Unavailable(msg) => Error::Unavailable(msg.clone()),
        }
    }
}

#[derive(Debug, Clone)]
enum Response {
    Rows(Vec<ResultRow>),
    Fail(ScriptedFailure),
}

#[derive(Debug, Clone)]
struct Fixture {
    needles: Vec<String>,
    response: Response,
}

impl Fixture {
    fn matches(&self, text: &str) -> bool {
        self.needles.iter().all(|n| text.contains(n.as_str()))
    }
}

/// A statement the backend was asked to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedQuery {
    pub session: SessionId,
    pub text: String,
    pub params: PropertyMap,
}

// ============================================================================
// MemoryBackend
// ============================================================================

/// Scripted in-memory backend. Cloning shares fixtures and the query log.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    fixtures: RwLock<Vec<Fixture>>,
    log: RwLock<Vec<ExecutedQuery>>,
    latency: RwLock<Option<Duration>>,
    next_session_id: AtomicU64,
    open_sessions: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing every needle with `rows`.
    pub fn on<I, S>(&self, needles: I, rows: Vec<ResultRow>) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(needles, Response::Rows(rows))
    }

    /// Fail statements containing every needle.
    pub fn fail_on<I, S>(&self, needles: I, failure: ScriptedFailure) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push(needles, Response::Fail(failure))
    }

    fn push<I, S>(&self, needles: I, response: Response) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let needles = needles.into_iter().map(Into::into).collect();
        self.inner.fixtures.write().push(Fixture { needles, response });
        self
    }

    /// Delay every statement by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.inner.latency.write() = latency;
    }

    /// Every statement run so far, oldest first.
    pub fn executed(&self) -> Vec<ExecutedQuery> {
        self.inner.log.read().clone()
    }

    pub fn clear_log(&self) {
        self.inner.log.write().clear();
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> u64 {
        self.inner.open_sessions.load(Ordering::Acquire)
    }

    fn respond(&self, text: &str) -> Option<Response> {
        self.inner
            .fixtures
            .read()
            .iter()
            .find(|f| f.matches(text))
            .map(|f| f.response.clone())
    }
}

// ============================================================================
// MemorySession
// ============================================================================

/// In-memory session (a marker; nothing is pooled).
#[derive(Debug)]
pub struct MemorySession {
    id: SessionId,
}

impl Session for MemorySession {
    fn id(&self) -> SessionId { self.id }
}

// ============================================================================
// GraphBackend impl
// ============================================================================

fn window(params: &PropertyMap) -> Option<(usize, usize)> {
    let skip = params.get("skip")?.as_int()?;
    let limit = params.get("limit")?.as_int()?;
    Some((usize::try_from(skip).ok()?, usize::try_from(limit).ok()?))
}

#[async_trait]
impl GraphBackend for MemoryBackend {
    type Session = MemorySession;

    async fn open_session(&self) -> Result<MemorySession> {
        let id = SessionId(self.inner.next_session_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.open_sessions.fetch_add(1, Ordering::AcqRel);
        Ok(MemorySession { id })
    }

    async fn close_session(&self, _session: MemorySession) -> Result<()> {
        self.inner.open_sessions.fetch_sub(1, Ordering::AcqRel);
        Ok(())
    }

    async fn run(
        &self,
        session: &MemorySession,
        text: &str,
        params: &PropertyMap,
        columns: &[String],
    ) -> Result<QueryResult> {
        self.inner.log.write().push(ExecutedQuery {
            session: session.id,
            text: text.to_owned(),
            params: params.clone(),
        });

        let latency = *self.inner.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let rows = match self.respond(text) {
            Some(Response::Fail(failure)) => return Err(failure.to_error()),
            Some(Response::Rows(rows)) => rows,
            None => Vec::new(),
        };

        let rows: Vec<ResultRow> = rows
            .into_iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| (c.clone(), row.values.get(c).cloned().unwrap_or(Value::Null)))
                    .collect()
            })
            .collect();
        let rows = match window(params) {
            Some((skip, limit)) => rows.into_iter().skip(skip).take(limit).collect(),
            None => rows,
        };
        trace!(session = %session.id, rows = rows.len(), "memory backend answered");

        Ok(QueryResult {
            columns: columns.to_vec(),
            stats: ExecutionStats {
                state: ExecutionState::Completed,
                rows_returned: rows.len() as u64,
                execution_time_ms: 0,
            },
            rows,
        })
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
