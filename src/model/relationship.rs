//! Relationship types and traversal direction in the ontology graph.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Traversal direction, seen from the entity being described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
}

impl Direction {
    /// Render `(left)<arrow>(right)` for a relationship pattern body.
    pub(crate) fn pattern(self, left: &str, rel: &str, right: &str) -> String {
        match self {
            Direction::Outgoing => format!("{left}-[{rel}]->{right}"),
            Direction::Incoming => format!("{left}<-[{rel}]-{right}"),
        }
    }
}

/// Anything spliced into query text (labels, aliases, variables) must be
/// an ASCII identifier.
pub(crate) fn check_identifier(what: &str, name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(Error::Configuration(format!("invalid {what} '{name}'")))
    }
}

/// A validated relationship type label (e.g. `has_display_name`, `isa`).
///
/// Cypher cannot bind labels as parameters, so labels are interpolated into
/// query text. Only ASCII identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelType(String);

impl RelType {
    pub fn new(label: impl Into<String>) -> Result<Self> {
        let label = label.into();
        check_identifier("relationship label", &label)?;
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
