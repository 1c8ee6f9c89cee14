//! # Cypher Composition
//!
//! Builds parameterized Cypher text from reusable subquery fragments.
//!
//! ```text
//! Seed ──→ Fragment ──→ Fragment ──→ ... ──→ WITH/WHERE ──→ RETURN/ORDER BY
//!  │          │
//!  │          └── CALL { WITH <var> OPTIONAL MATCH ... RETURN ... AS alias }
//!  └── CALL { MATCH ... RETURN DISTINCT cui AS <var>, term AS <display> }
//! ```
//!
//! Query text is a pure function of the composer's configuration. Everything
//! a caller supplies is bound as a parameter.

pub mod composer;
pub mod filter;
pub mod fragment;

pub use composer::QueryComposer;
pub use filter::{Filter, FilterOp, Target};
pub use fragment::{FragmentKind, Projection, PropertyFragment, RecordPart, Seed};

use crate::model::PropertyMap;

/// Column name of a count query's only column.
pub const COUNT_COLUMN: &str = "total_count";

/// Which variant of a composition a query is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Every matching entity.
    Rows,
    /// `count(DISTINCT key)` under the same filters.
    Count,
    /// Rows, windowed by bound `$skip`/`$limit`.
    Page,
}

/// A complete statement ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub text: String,
    pub params: PropertyMap,
    /// Declared result aliases, in order.
    pub columns: Vec<String>,
    /// The concept-identifier variable every fragment correlates on.
    pub correlation_variable: String,
    pub kind: QueryKind,
}
