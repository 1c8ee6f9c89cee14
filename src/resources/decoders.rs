//! Cell and row decoders for fields with a family-specific layout.

use crate::decode::{scalar, split_padded, string_list, FIELD_SEP, RECORD_SEP};
use crate::decode::reference::split_code;
use crate::execution::ResultRow;
use crate::model::{DomainObject, DomainValue, Value};
use crate::Result;

use super::schema::{BIOMARKER_REFERENCE, UNIPROT_CURATION, UNIPROT_ORGANISM};

/// Text of the first `SAB|text` definition.
pub fn definition_text(value: &Value) -> DomainValue {
    let first = scalar(value);
    split_padded(&first, FIELD_SEP, 2)[1].into()
}

/// `HGNC:7178|multimerin 1|MMRN1` as a cell type biomarker.
pub fn biomarker(value: &Value) -> DomainValue {
    let record = scalar(value);
    let parts = split_padded(&record, FIELD_SEP, 3);
    let (vocabulary, id) = split_code(parts[0]);
    let entry = DomainObject::new()
        .with("vocabulary", vocabulary.name())
        .with("id", id)
        .with("name", parts[1])
        .with("symbol", parts[2]);
    DomainObject::new()
        .with("reference", BIOMARKER_REFERENCE)
        .with("biomarker_type", "gene")
        .with("entry", entry)
        .into()
}

/// `UBERON:0000948|heart|HRA` as an organ a cell type is located in.
pub fn organ(value: &Value) -> DomainValue {
    let record = scalar(value);
    let parts = split_padded(&record, FIELD_SEP, 3);
    let (vocabulary, id) = split_code(parts[0]);
    DomainObject::new()
        .with("id", id)
        .with("source", vocabulary.name().to_uppercase())
        .with("name", parts[1])
        .with("annotation", parts[2])
        .into()
}

/// `CL:0000236|B cell|HRA|UBERON:0002106*spleen;...|definition` as a cell
/// type a gene marks. The definition comes last and may hold `|`.
pub fn marked_cell_type(value: &Value) -> DomainValue {
    let record = scalar(value);
    let mut parts: Vec<&str> = record.splitn(5, FIELD_SEP).collect();
    parts.resize(5, "");
    let organs: Vec<DomainValue> = parts[3]
        .split(RECORD_SEP)
        .filter(|o| !o.is_empty())
        .map(|o| {
            let (code, name) = o.split_once('*').unwrap_or((o, ""));
            let (source, id) = code.split_once(':').unwrap_or((code, ""));
            DomainObject::new().with("source", source).with("id", id).with("name", name).into()
        })
        .collect();
    let references: Vec<&str> = std::iter::once(parts[2]).filter(|r| !r.is_empty()).collect();
    DomainObject::new()
        .with("id", parts[0])
        .with("name", parts[1])
        .with("definition", parts[4])
        .with("organs", DomainValue::List(organs))
        .with("references", references)
        .into()
}

/// An assay class that must contain other assays is a multi-assay.
pub fn is_multiassay(row: &ResultRow) -> Result<DomainValue> {
    Ok((!string_list(row.cell("must_contain")?).is_empty()).into())
}

/// UniProtKB entry block built from the accession and its definitions.
pub fn protein_references(row: &ResultRow) -> Result<DomainValue> {
    let id = scalar(row.cell("uniprotkb_id")?);
    if id.is_empty() {
        return Ok(DomainValue::List(Vec::new()));
    }
    let entry = string_list(row.cell("description")?)
        .first()
        .map(|d| split_padded(d, FIELD_SEP, 2)[1].to_owned())
        .unwrap_or_default();
    let reference = DomainObject::new()
        .with("source", "uniprotkb")
        .with("entry", entry)
        .with("url", format!("https://www.uniprot.org/uniprotkb/{id}/entry"))
        .with("curation", UNIPROT_CURATION)
        .with("organism", vec![UNIPROT_ORGANISM]);
    Ok(vec![reference].into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_biomarker_entry() {
        let v = biomarker(&Value::from("HGNC:7178|multimerin 1|MMRN1"));
        let obj = v.as_object().unwrap();
        let entry = obj.get("entry").and_then(DomainValue::as_object).unwrap();
        assert_eq!(entry.get("vocabulary"), Some(&DomainValue::from("hugo")));
        assert_eq!(entry.get("id"), Some(&DomainValue::from("7178")));
        assert_eq!(entry.get("symbol"), Some(&DomainValue::from("MMRN1")));
        assert_eq!(obj.get("biomarker_type"), Some(&DomainValue::from("gene")));
    }

    #[test]
    fn test_organ_pads_missing_annotation() {
        let v = organ(&Value::from("UBERON:0000948|heart"));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.get("source"), Some(&DomainValue::from("UBERON")));
        assert_eq!(obj.get("id"), Some(&DomainValue::from("0000948")));
        assert_eq!(obj.get("annotation"), Some(&DomainValue::from("")));
    }

    #[test]
    fn test_marked_cell_type_organs_and_references() {
        let v = marked_cell_type(&Value::from(
            "CL:0000115|endothelial cell|HRA|UBERON:0000948*heart;UBERON:0002048*lung|Lines vessels | and more",
        ));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.get("definition"), Some(&DomainValue::from("Lines vessels | and more")));
        assert_eq!(obj.get("references"), Some(&DomainValue::from(vec!["HRA"])));
        let organs = obj.get("organs").and_then(DomainValue::as_list).unwrap();
        assert_eq!(organs.len(), 2);
        let lung = organs[1].as_object().unwrap();
        assert_eq!(lung.get("source"), Some(&DomainValue::from("UBERON")));
        assert_eq!(lung.get("id"), Some(&DomainValue::from("0002048")));
        assert_eq!(lung.get("name"), Some(&DomainValue::from("lung")));
    }

    #[test]
    fn test_marked_cell_type_without_organs() {
        let v = marked_cell_type(&Value::from("CL:0000115|endothelial cell"));
        let obj = v.as_object().unwrap();
        assert_eq!(obj.get("organs"), Some(&DomainValue::List(vec![])));
        assert_eq!(obj.get("references"), Some(&DomainValue::List(vec![])));
        assert_eq!(obj.get("definition"), Some(&DomainValue::from("")));
    }

    #[test]
    fn test_is_multiassay() {
        let single = ResultRow::new().with("must_contain", Value::List(vec![]));
        assert_eq!(is_multiassay(&single).unwrap(), DomainValue::Bool(false));
        let multi = ResultRow::new().with("must_contain", vec!["RNAseq", "ATACseq"]);
        assert_eq!(is_multiassay(&multi).unwrap(), DomainValue::Bool(true));
        assert!(is_multiassay(&ResultRow::new()).is_err());
    }

    #[test]
    fn test_definition_text() {
        assert_eq!(definition_text(&Value::from(vec!["CL|A lymphocyte."])), DomainValue::from("A lymphocyte."));
        assert_eq!(definition_text(&Value::Null), DomainValue::from(""));
    }

    #[test]
    fn test_protein_references() {
        let row = ResultRow::new()
            .with("uniprotkb_id", "Q13201")
            .with("description", vec!["UNIPROTKB|Multimerin-1."]);
        let refs = protein_references(&row).unwrap();
        let first = refs.as_list().and_then(|l| l[0].as_object()).unwrap();
        assert_eq!(first.get("entry"), Some(&DomainValue::from("Multimerin-1.")));
        assert_eq!(first.get("url"), Some(&DomainValue::from("https://www.uniprot.org/uniprotkb/Q13201/entry")));
    }

    #[test]
    fn test_protein_references_without_accession() {
        let row = ResultRow::new().with("uniprotkb_id", Value::Null).with("description", Value::Null);
        assert_eq!(protein_references(&row).unwrap(), DomainValue::List(vec![]));
    }
}
