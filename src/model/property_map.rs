//! PropertyMap: bound query parameters.

use std::collections::BTreeMap;
use super::Value;

/// A map of parameter names to values.
///
/// Ordered so that the same parameter set always renders and compares the
/// same way.
pub type PropertyMap = BTreeMap<String, Value>;

/// Build a parameter map from `(name, value)` pairs.
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
