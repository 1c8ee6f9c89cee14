//! # Data Model
//!
//! Plain data shared by every layer: engine cell values, bound parameters,
//! relationship labels, and the domain object tree handed to callers.
//!
//! Design rule: no I/O, no state, no async in this module.

pub mod value;
pub mod property_map;
pub mod relationship;
pub mod domain;

pub use value::Value;
pub use property_map::{PropertyMap, params};
pub use relationship::{Direction, RelType};
pub use domain::{DomainObject, DomainValue};
