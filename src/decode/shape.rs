//! Shape descriptors: how one raw row becomes one domain object.

use crate::execution::ResultRow;
use crate::model::{DomainObject, DomainValue, Value};
use crate::Result;

use super::{code_ids, compound_list, flag, key_value, nested_records, passthrough, scalar, string_list, type_mapping, ITEM_SEP};

/// Custom decoder for cells no generic rule covers.
pub type CellDecoder = fn(&Value) -> DomainValue;

/// Decoder for fields built from several columns of a row.
pub type RowDecoder = fn(&ResultRow) -> Result<DomainValue>;

/// How a single cell is decoded.
#[derive(Debug, Clone, Copy)]
pub enum FieldRule {
    /// First element, the string itself, or `""`.
    Scalar,
    /// List of non-empty strings.
    StringList,
    /// `true`/`false`, or `""` when absent.
    Flag,
    /// One `|` record into named fields.
    KeyValue(&'static [&'static str]),
    /// Comma-separated or list-element `|` records.
    CompoundList(&'static [&'static str]),
    /// Each element `a|b|c;d|e|f` becomes `{nodes: [...]}`.
    NestedRecords(&'static [&'static str]),
    /// Each element is a reference code (see [`decode_reference`](super::decode_reference)).
    References,
    /// `|`-separated or list code ids.
    CodeIds,
    /// Each element is `mapping_source|type_source|xsd:type`.
    TypeMappings,
    /// Cell as-is.
    Passthrough,
    /// Each element through a custom decoder.
    Each(CellDecoder),
    /// The whole cell through a custom decoder.
    Custom(CellDecoder),
}

impl FieldRule {
    pub fn apply(&self, value: &Value) -> DomainValue {
        match self {
            FieldRule::Scalar => DomainValue::Str(scalar(value)),
            FieldRule::StringList => string_list(value).into(),
            FieldRule::Flag => flag(value),
            FieldRule::KeyValue(names) => DomainValue::Object(key_value(&scalar(value), names)),
            FieldRule::CompoundList(names) => compound_list(value, ITEM_SEP, names).into(),
            FieldRule::NestedRecords(names) => string_list(value)
                .iter()
                .map(|r| DomainObject::new().with("nodes", nested_records(r, names)))
                .collect::<Vec<_>>()
                .into(),
            FieldRule::References => string_list(value)
                .iter()
                .map(|r| super::decode_reference(r))
                .collect::<Vec<_>>()
                .into(),
            FieldRule::CodeIds => code_ids(value).into(),
            FieldRule::TypeMappings => string_list(value)
                .iter()
                .map(|r| type_mapping(r))
                .collect::<Vec<_>>()
                .into(),
            FieldRule::Passthrough => passthrough(value),
            FieldRule::Each(decode) => DomainValue::List(
                value
                    .string_items()
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .map(|s| decode(&Value::from(s)))
                    .collect(),
            ),
            FieldRule::Custom(decode) => decode(value),
        }
    }
}

/// Where an output field comes from.
#[derive(Debug, Clone)]
pub enum FieldSource {
    Column { column: &'static str, rule: FieldRule },
    Row(RowDecoder),
    /// A sub-object decoded from the same row.
    Nested(FieldShape),
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    pub source: FieldSource,
}

/// Ordered field specs for one resource shape.
#[derive(Debug, Clone, Default)]
pub struct FieldShape {
    fields: Vec<FieldSpec>,
}

impl FieldShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &'static str, column: &'static str, rule: FieldRule) -> Self {
        self.fields.push(FieldSpec { key, source: FieldSource::Column { column, rule } });
        self
    }

    /// A field derived from the whole row.
    pub fn derived(mut self, key: &'static str, decode: RowDecoder) -> Self {
        self.fields.push(FieldSpec { key, source: FieldSource::Row(decode) });
        self
    }

    /// A sub-object built by `shape` from the same row.
    pub fn nested(mut self, key: &'static str, shape: FieldShape) -> Self {
        self.fields.push(FieldSpec { key, source: FieldSource::Nested(shape) });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Source columns this shape reads, nested shapes included.
    pub fn columns(&self) -> Box<dyn Iterator<Item = &'static str> + '_> {
        Box::new(self.fields.iter().flat_map(|f| -> Box<dyn Iterator<Item = &'static str> + '_> {
            match &f.source {
                FieldSource::Column { column, .. } => Box::new(std::iter::once(*column)),
                FieldSource::Row(_) => Box::new(std::iter::empty()),
                FieldSource::Nested(shape) => shape.columns(),
            }
        }))
    }
}

/// Decode one row. A column the shape names but the row lacks is a
/// composition mismatch and fails; cell contents never do.
pub fn decode_row(shape: &FieldShape, row: &ResultRow) -> Result<DomainObject> {
    let mut obj = DomainObject::new();
    for spec in &shape.fields {
        let value = match &spec.source {
            FieldSource::Column { column, rule } => rule.apply(row.cell(column)?),
            FieldSource::Row(decode) => decode(row)?,
            FieldSource::Nested(shape) => decode_row(shape, row)?.into(),
        };
        obj.insert(spec.key, value);
    }
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn shape() -> FieldShape {
        FieldShape::new()
            .field("name", "name", FieldRule::Scalar)
            .field("code_ids", "code_ids", FieldRule::CodeIds)
            .field("entities", "entities", FieldRule::NestedRecords(&["source", "code", "name"]))
    }

    #[test]
    fn test_decode_row_in_declared_order() {
        let row = ResultRow::new()
            .with("name", "age_unit")
            .with("code_ids", "HMFIELD:1|CEDAR:x")
            .with("entities", vec!["HMFIELD|3004|sample;HUBMAP|C040002|Sample"]);
        let obj = decode_row(&shape(), &row).unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["name", "code_ids", "entities"]);
        let entities = obj.get("entities").and_then(DomainValue::as_list).unwrap();
        let nodes = entities[0].as_object().and_then(|o| o.get("nodes")).and_then(DomainValue::as_list).unwrap();
        assert_eq!(nodes.len(), 2);
    }

    #[test]
    fn test_null_cells_decode_to_empty_forms() {
        let row = ResultRow::new()
            .with("name", Value::Null)
            .with("code_ids", Value::Null)
            .with("entities", Value::Null);
        let obj = decode_row(&shape(), &row).unwrap();
        assert_eq!(obj.get("name"), Some(&DomainValue::from("")));
        assert_eq!(obj.get("entities"), Some(&DomainValue::List(vec![])));
    }

    #[test]
    fn test_missing_column_fails() {
        let row = ResultRow::new().with("name", "x");
        assert!(matches!(decode_row(&shape(), &row), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_derived_field_reads_several_columns() {
        fn joined(row: &ResultRow) -> Result<DomainValue> {
            Ok(format!("{}/{}", row.get::<String>("a")?, row.get::<String>("b")?).into())
        }
        let shape = FieldShape::new().field("a", "a", FieldRule::Scalar).derived("ab", joined);
        let row = ResultRow::new().with("a", "x").with("b", "y");
        let obj = decode_row(&shape, &row).unwrap();
        assert_eq!(obj.get("ab"), Some(&DomainValue::from("x/y")));
        assert_eq!(shape.columns().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_nested_shape_reads_the_same_row() {
        let shape = FieldShape::new().field("code", "rule_code", FieldRule::Scalar).nested(
            "value",
            FieldShape::new()
                .field("assaytype", "assaytype", FieldRule::Scalar)
                .nested("fig2", FieldShape::new().field("modality", "modality", FieldRule::Scalar)),
        );
        let row = ResultRow::new()
            .with("rule_code", "HUBMAP:C200001")
            .with("assaytype", "AF")
            .with("modality", "Imaging");
        let obj = decode_row(&shape, &row).unwrap();
        assert_eq!(
            obj.to_json(),
            serde_json::json!({"code": "HUBMAP:C200001", "value": {"assaytype": "AF", "fig2": {"modality": "Imaging"}}})
        );
        assert_eq!(shape.columns().collect::<Vec<_>>(), vec!["rule_code", "assaytype", "modality"]);
        let short = ResultRow::new().with("rule_code", "x").with("assaytype", "AF");
        assert!(matches!(decode_row(&shape, &short), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_references_rule() {
        let v = FieldRule::References.apply(&Value::from(vec!["ENTREZ:4283", "HGNC:7178"]));
        let refs = v.as_list().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[1].as_object().and_then(|o| o.get("source")), Some(&DomainValue::from("hugo")));
    }
}
