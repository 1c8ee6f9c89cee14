//! Neo4j over Bolt via `neo4rs`.
//!
//! `neo4rs` pools connections inside [`Graph`], so a session here is only a
//! ticket naming the target database. Every statement is sent with its
//! parameters bound; the text is never rewritten.
//!
//! `neo4rs` 0.8 cannot attach a transaction timeout to a statement. The
//! deadline is enforced by [`GraphHandle`](crate::GraphHandle),
//! which drops the in-flight stream; a server-side bound comes from the
//! database's `db.transaction.timeout` setting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use neo4rs::{
    query, BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder, Graph,
};
use tracing::{debug, info, trace};

use crate::execution::{ExecutionState, ExecutionStats, QueryResult, ResultRow};
use crate::model::{PropertyMap, Value};
use crate::session::{Session, SessionId};
use crate::{Error, Result};
use super::{BackendConfig, GraphBackend};

/// Read-only Bolt backend.
pub struct BoltBackend {
    graph: Graph,
    database: Option<String>,
    next_session_id: AtomicU64,
}

impl BoltBackend {
    pub async fn connect(uri: &str, user: &str, password: &str, database: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::default().uri(uri).user(user).password(password);
        if let Some(db) = database {
            builder = builder.db(db);
        }
        let config = builder.build().map_err(map_error)?;
        let graph = Graph::connect(config).await.map_err(map_error)?;
        info!(uri, database = database.unwrap_or("default"), "bolt backend connected");
        Ok(Self {
            graph,
            database: database.map(str::to_owned),
            next_session_id: AtomicU64::new(0),
        })
    }

    /// Connect as `config` describes. Only the `bolt` kind is accepted.
    pub async fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Bolt { uri, user, password, database } => {
                Self::connect(uri, user, password, database.as_deref()).await
            }
            BackendConfig::Memory => {
                Err(Error::Configuration("backend kind 'memory' cannot open a bolt connection".into()))
            }
        }
    }
}

/// A logical session over the pooled graph.
#[derive(Debug)]
pub struct BoltSession {
    id: SessionId,
    database: Option<String>,
}

impl Session for BoltSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

#[async_trait]
impl GraphBackend for BoltBackend {
    type Session = BoltSession;

    async fn open_session(&self) -> Result<BoltSession> {
        let id = SessionId(self.next_session_id.fetch_add(1, Ordering::Relaxed) + 1);
        Ok(BoltSession { id, database: self.database.clone() })
    }

    async fn close_session(&self, _session: BoltSession) -> Result<()> {
        Ok(())
    }

    async fn run(
        &self,
        session: &BoltSession,
        text: &str,
        params: &PropertyMap,
        columns: &[String],
    ) -> Result<QueryResult> {
        let mut q = query(text);
        for (name, value) in params {
            q = q.param(name, to_bolt(value));
        }
        debug!(session = %session.id, params = params.len(), "sending statement over bolt");

        let mut stream = self.graph.execute(q).await.map_err(map_error)?;
        let mut rows = Vec::new();
        while let Some(record) = stream.next().await.map_err(map_error)? {
            let mut row = ResultRow::new();
            for column in columns {
                let cell = read_cell(column, record.get::<BoltType>(column))?;
                row.values.insert(column.clone(), cell);
            }
            rows.push(row);
        }

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

    async fn verify_connectivity(&self) -> Result<()> {
        self.graph.run(query("RETURN 1")).await.map_err(map_error)
    }

    async fn shutdown(&self) -> Result<()> {
        info!("bolt backend shut down");
        Ok(())
    }
}

fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::Boolean(BoltBoolean::new(*b)),
        Value::Int(i) => BoltType::Integer(BoltInteger::new(*i)),
        Value::Float(f) => BoltType::Float(BoltFloat::new(*f)),
        Value::String(s) => BoltType::String(BoltString::from(s.as_str())),
        Value::List(items) => BoltType::List(BoltList::from(items.iter().map(to_bolt).collect::<Vec<_>>())),
        Value::Map(m) => {
            let value: HashMap<BoltString, BoltType> =
                m.iter().map(|(k, v)| (BoltString::from(k.as_str()), to_bolt(v))).collect();
            BoltType::Map(BoltMap { value })
        }
    }
}

/// A declared column the record cannot yield is a type error, never a
/// silent null: a null here would decode as a real empty field.
fn read_cell<E: std::fmt::Display>(column: &str, read: std::result::Result<BoltType, E>) -> Result<Value> {
    match read {
        Ok(bolt) => from_bolt(bolt),
        Err(e) => {
            trace!(column, error = %e, "declared column not readable");
            Err(Error::TypeError { expected: format!("column '{column}'"), got: e.to_string() })
        }
    }
}

fn from_bolt(bolt: BoltType) -> Result<Value> {
    Ok(match bolt {
        BoltType::Null(_) => Value::Null,
        BoltType::Boolean(b) => Value::Bool(b.value),
        BoltType::Integer(i) => Value::Int(i.value),
        BoltType::Float(f) => Value::Float(f.value),
        BoltType::String(s) => Value::String(s.value),
        BoltType::List(l) => Value::List(l.value.into_iter().map(from_bolt).collect::<Result<_>>()?),
        BoltType::Map(m) => Value::Map(
            m.value.into_iter().map(|(k, v)| Ok((k.value, from_bolt(v)?))).collect::<Result<_>>()?,
        ),
        other => {
            return Err(Error::TypeError {
                expected: "null, boolean, number, string, list or map".into(),
                got: format!("{other:?}"),
            });
        }
    })
}

/// Engine timeouts first, then statements the engine refused, then
/// everything else as an availability problem.
fn map_error(e: neo4rs::Error) -> Error {
    let msg = e.to_string();
    if msg.contains("TransactionTimedOut") {
        Error::Timeout { timeout_ms: 0 }
    } else if msg.contains("Neo.ClientError.Statement") {
        Error::Configuration(format!("statement rejected: {msg}"))
    } else {
        Error::Unavailable(msg)
    }
}
