//! Query execution results.
//!
//! Raw rows exactly as the graph engine returned them, plus the outcome of
//! the execution that produced them.

use std::collections::HashMap;
use crate::model::*;
use crate::{Error, Result};

/// Query execution result.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub stats: ExecutionStats,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A single raw row: column alias → cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    pub values: HashMap<String, Value>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style cell insert (mostly for fixtures).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// The raw cell for a column.
    ///
    /// A column the query never declared is a composition bug, not a null.
    pub fn cell(&self, column: &str) -> Result<&Value> {
        self.values
            .get(column)
            .ok_or_else(|| Error::Configuration(format!("column '{column}' missing from result row")))
    }

    /// Get a typed value from the row.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        T::from_value(self.cell(key)?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ResultRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

/// Where a single execution ended up.
///
/// `Idle → Executing → {Completed | TimedOut | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    #[default]
    Idle,
    Executing,
    Completed,
    TimedOut,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::TimedOut | ExecutionState::Failed)
    }
}

/// Execution statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionStats {
    pub state: ExecutionState,
    pub rows_returned: u64,
    pub execution_time_ms: u64,
}

/// Convert from Value to concrete types.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

impl FromValue for Value {
    fn from_value(val: &Value) -> Result<Self> {
        Ok(val.clone())
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            _ => Err(Error::TypeError {
                expected: "String".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_int().ok_or_else(|| Error::TypeError {
            expected: "Integer".into(),
            got: val.type_name().into(),
        })
    }
}

impl FromValue for u64 {
    fn from_value(val: &Value) -> Result<Self> {
        let i = i64::from_value(val)?;
        u64::try_from(i).map_err(|_| Error::TypeError {
            expected: "non-negative Integer".into(),
            got: i.to_string(),
        })
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_bool().ok_or_else(|| Error::TypeError {
            expected: "Boolean".into(),
            got: val.type_name().into(),
        })
    }
}
