//! Domain objects: the nested response tree built from decoded rows.
//!
//! One generic tree serves every resource family (genes, proteins, cell
//! types, assay classes, field mappings, ...). Field order is preserved so
//! the serialized JSON reads in the order the shape descriptor declares.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A value inside a [`DomainObject`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DomainValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<DomainValue>),
    Object(DomainObject),
}

impl DomainValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DomainValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[DomainValue]> {
        match self {
            DomainValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&DomainObject> {
        match self {
            DomainValue::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn empty_str() -> Self {
        DomainValue::Str(String::new())
    }
}

impl From<&str> for DomainValue { fn from(v: &str) -> Self { DomainValue::Str(v.to_owned()) } }
impl From<String> for DomainValue { fn from(v: String) -> Self { DomainValue::Str(v) } }
impl From<bool> for DomainValue { fn from(v: bool) -> Self { DomainValue::Bool(v) } }
impl From<i64> for DomainValue { fn from(v: i64) -> Self { DomainValue::Int(v) } }
impl From<DomainObject> for DomainValue { fn from(v: DomainObject) -> Self { DomainValue::Object(v) } }
impl<T: Into<DomainValue>> From<Vec<T>> for DomainValue {
    fn from(v: Vec<T>) -> Self { DomainValue::List(v.into_iter().map(Into::into).collect()) }
}

/// An ordered set of named fields. Identity is structural.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainObject {
    fields: Vec<(String, DomainValue)>,
}

impl DomainObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DomainValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace a field. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<DomainValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&DomainValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Convert to a `serde_json::Value` (object keys keep insertion order
    /// only if `serde_json` is built with `preserve_order`).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Serialize for DomainObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for DomainValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DomainValue::Null => serializer.serialize_unit(),
            DomainValue::Bool(b) => serializer.serialize_bool(*b),
            DomainValue::Int(i) => serializer.serialize_i64(*i),
            DomainValue::Str(s) => serializer.serialize_str(s),
            DomainValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DomainValue::Object(o) => o.serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_position() {
        let mut o = DomainObject::new().with("a", "1").with("b", "2");
        o.insert("a", "3");
        assert_eq!(o.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(o.get("a"), Some(&DomainValue::from("3")));
    }

    #[test]
    fn test_serialize_in_declared_order() {
        let o = DomainObject::new()
            .with("zeta", true)
            .with("alpha", Vec::<DomainValue>::new())
            .with("mid", DomainValue::Null);
        let text = serde_json::to_string(&o).unwrap();
        assert_eq!(text, r#"{"zeta":true,"alpha":[],"mid":null}"#);
    }
}
