//! # Delimited Record Decoding
//!
//! The graph packs compound values into strings: `|` between the parts of a
//! record, `;` (or `,`) between records, or one record per list element.
//! These functions unpack them.
//!
//! Every decoder is total. Short input is padded with empty strings, extra
//! parts are ignored, null becomes the empty form of the output. Anomalies
//! are logged at `trace` and never fail the row.

pub mod reference;
pub mod shape;

pub use reference::{decode_reference, Vocabulary};
pub use shape::{decode_row, CellDecoder, FieldRule, FieldShape, FieldSource, FieldSpec, RowDecoder};

use tracing::trace;

use crate::model::{DomainObject, DomainValue, Value};

/// Separates the parts of one record.
pub const FIELD_SEP: char = '|';
/// Separates records packed into one string.
pub const RECORD_SEP: char = ';';
/// Separates items of a compound list packed into one string.
pub const ITEM_SEP: char = ',';

/// Split `s` on `sep` into exactly `n` parts: pad with `""`, drop extras.
pub fn split_padded(s: &str, sep: char, n: usize) -> Vec<&str> {
    let mut parts: Vec<&str> = s.split(sep).take(n).collect();
    if parts.len() < n {
        trace!(record = s, expected = n, found = parts.len(), "short delimited record padded");
        parts.resize(n, "");
    }
    parts
}

/// The scalar form of a cell: the string itself, the first element of a
/// list, or `""` for null.
pub fn scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::List(items) => items.first().map(scalar).unwrap_or_default(),
        Value::Map(_) => {
            trace!("map cell where a scalar was expected");
            String::new()
        }
    }
}

/// Every string in a cell. A bare string counts as a one-element list; null
/// and empty strings are dropped.
pub fn string_list(value: &Value) -> Vec<String> {
    value
        .string_items()
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Decode one `|` record into named fields.
pub fn key_value(record: &str, names: &[&str]) -> DomainObject {
    let mut obj = DomainObject::new();
    for (name, part) in names.iter().zip(split_padded(record, FIELD_SEP, names.len())) {
        obj.insert(*name, part);
    }
    obj
}

/// Decode a compound list: list elements, or items of one string separated
/// by `item_sep`, each decoded with [`key_value`].
pub fn compound_list(value: &Value, item_sep: char, names: &[&str]) -> Vec<DomainObject> {
    let items: Vec<&str> = match value {
        Value::String(s) => s.split(item_sep).collect(),
        other => other.string_items(),
    };
    items
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| key_value(s.trim(), names))
        .collect()
}

/// Decode `a|b|c;d|e|f` into one object per `|` record. Segments without
/// a field separator carry nothing and are skipped.
pub fn nested_records(record: &str, names: &[&str]) -> Vec<DomainObject> {
    record
        .split(RECORD_SEP)
        .filter(|seg| seg.contains(FIELD_SEP))
        .map(|seg| key_value(seg, names))
        .collect()
}

/// Code ids of a cell: list elements, or a `|`-separated string.
pub fn code_ids(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s
            .split(FIELD_SEP)
            .filter(|c| !c.is_empty())
            .map(str::to_owned)
            .collect(),
        other => string_list(other),
    }
}

/// Decode `mapping_source|type_source|xsd:type`.
pub fn type_mapping(record: &str) -> DomainObject {
    let parts = split_padded(record, FIELD_SEP, 3);
    let ty = parts[2].strip_prefix("xsd:").unwrap_or(parts[2]);
    DomainObject::new()
        .with("mapping_source", parts[0])
        .with("type_source", parts[1])
        .with("type", ty)
}

/// A boolean cell. `"true"`/`"false"` strings are accepted in any case;
/// anything else is preserved as the `""` third state.
pub fn flag(value: &Value) -> DomainValue {
    match value {
        Value::Bool(b) => DomainValue::Bool(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => DomainValue::Bool(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => DomainValue::Bool(false),
        Value::List(items) => items.first().map(flag).unwrap_or_else(DomainValue::empty_str),
        _ => DomainValue::empty_str(),
    }
}

/// Convert an arbitrary cell without interpretation.
pub fn passthrough(value: &Value) -> DomainValue {
    match value {
        Value::Null => DomainValue::Null,
        Value::Bool(b) => DomainValue::Bool(*b),
        Value::Int(i) => DomainValue::Int(*i),
        Value::Float(f) => DomainValue::Str(f.to_string()),
        Value::String(s) => DomainValue::Str(s.clone()),
        Value::List(items) => DomainValue::List(items.iter().map(passthrough).collect()),
        Value::Map(m) => {
            let mut keys: Vec<&String> = m.keys().collect();
            keys.sort();
            let mut obj = DomainObject::new();
            for k in keys {
                obj.insert(k.as_str(), passthrough(&m[k]));
            }
            DomainValue::Object(obj)
        }
    }
}
