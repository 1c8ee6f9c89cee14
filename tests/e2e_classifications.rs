//! End-to-end tests for assay classes, dataset types, value sets and gene
//! symbol relationships: decoded response trees and request validation.

use std::time::Duration;

use hs_ontology::storage::MemoryBackend;
use hs_ontology::{
    Error, GraphHandle, NamedFilters, OntologyConfig, OntologyService, ResourceFamily, ResultRow, Value,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn service(backend: &MemoryBackend) -> OntologyService<MemoryBackend> {
    let graph = GraphHandle::with_backend(backend.clone(), Duration::from_secs(5));
    OntologyService::new(graph, OntologyConfig::default()).unwrap()
}

fn filters(pairs: &[(&str, &str)]) -> NamedFilters {
    let mut f = NamedFilters::new();
    for (k, v) in pairs {
        f.entry((*k).to_owned()).or_default().push((*v).to_owned());
    }
    f
}

// ============================================================================
// Assay classes and dataset types
// ============================================================================

fn assay_class(code: &str, description: &str, must_contain: Vec<&str>) -> ResultRow {
    ResultRow::new()
        .with("AssayClassCUI", format!("CUI-{code}"))
        .with("rule_code", format!("HUBMAP:{code}"))
        .with("rule_description", description)
        .with("assaytype", "AF")
        .with("process_state", "primary")
        .with("pipeline_shorthand", "")
        .with("description", "Autofluorescence Microscopy")
        .with("active_status", "active")
        .with("must_contain", must_contain)
        .with("vitessce_hints", Vec::<String>::new())
        .with("contains_full_genetic_sequences", false)
        .with("dataset_type", "Auto-fluorescence")
        .with("pdr_category", "Imaging")
        .with("fig2_aggregated_assaytype", "AF")
        .with("fig2_modality", "Imaging")
        .with("fig2_category", "Microscopy")
}

#[tokio::test]
async fn test_assay_class_tree() {
    let backend = MemoryBackend::new();
    backend.on(["AS rule_code"], vec![assay_class("C200001", "non-DCWG primary AF", vec![])]);

    let classes = service(&backend)
        .compose_and_run(ResourceFamily::AssayClasses, &filters(&[("assayclass", "C200001")]))
        .await
        .unwrap();

    assert_eq!(
        classes[0].to_json(),
        json!({
            "rule_description": {"code": "HUBMAP:C200001", "name": "non-DCWG primary AF"},
            "value": {
                "assaytype": "AF",
                "process_state": "primary",
                "pipeline_shorthand": "",
                "description": "Autofluorescence Microscopy",
                "active_status": "active",
                "is_multiassay": false,
                "must_contain": [],
                "vitessce_hints": [],
                "contains_full_genetic_sequences": false,
                "dataset_type": {
                    "dataset_type": "Auto-fluorescence",
                    "PDR_category": "Imaging",
                    "fig2": {"aggregated_assaytype": "AF", "modality": "Imaging", "category": "Microscopy"},
                },
            },
        })
    );
    let executed = backend.executed();
    assert!(executed[0].params.values().any(|v| *v == Value::from(vec!["c200001", "hubmap:c200001"])));
}

#[tokio::test]
async fn test_multiassay_class_deduplicated_on_rule_code() {
    let backend = MemoryBackend::new();
    let multi = assay_class("C200150", "10X Multiome", vec!["RNAseq", "ATACseq"]);
    backend.on(["AS rule_code"], vec![multi.clone(), multi]);

    let classes =
        service(&backend).compose_and_run(ResourceFamily::AssayClasses, &NamedFilters::new()).await.unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].to_json()["value"]["is_multiassay"], json!(true));
    assert_eq!(classes[0].to_json()["value"]["must_contain"], json!(["RNAseq", "ATACseq"]));
}

#[tokio::test]
async fn test_dataset_type_detail() {
    let backend = MemoryBackend::new();
    backend.on(
        ["AS is_externally_processed"],
        vec![ResultRow::new()
            .with("DatasetTypeCUI", "C1")
            .with("dataset_type", "Histology")
            .with("pdr_category", "Imaging")
            .with("fig2_aggregated_assaytype", "H&E")
            .with("fig2_modality", "Imaging")
            .with("fig2_category", "Microscopy")
            .with("is_externally_processed", true)],
    );
    let types = service(&backend)
        .compose_and_run(ResourceFamily::DatasetTypes, &filters(&[("is_externally_processed", "TRUE")]))
        .await
        .unwrap();
    assert_eq!(
        types[0].to_json(),
        json!({
            "dataset_type": "Histology",
            "PDR_category": "Imaging",
            "fig2": {"aggregated_assaytype": "H&E", "modality": "Imaging", "category": "Microscopy"},
            "is_externally_processed": true,
        })
    );
    assert_eq!(backend.executed()[0].params.get("filter_0"), Some(&Value::Bool(true)));
}

// ============================================================================
// Value sets
// ============================================================================

fn value_set_request() -> NamedFilters {
    filters(&[
        ("parent_sab", "SENNET"),
        ("parent_code", "C020076"),
        ("child_sabs", "SENNET"),
        ("child_sabs", "SNOMEDCT_US"),
    ])
}

#[tokio::test]
async fn test_value_set_members() {
    let backend = MemoryBackend::new();
    backend.on(
        ["$seed_child_sabs"],
        vec![
            ResultRow::new().with("ChildCUI", "C1").with("sab", "SENNET").with("code", "C020077").with("term", "Female"),
            ResultRow::new().with("ChildCUI", "C2").with("sab", "SNOMEDCT_US").with("code", "248153007").with("term", "Male"),
        ],
    );
    let members = service(&backend).compose_and_run(ResourceFamily::ValueSet, &value_set_request()).await.unwrap();
    let json: Vec<_> = members.iter().map(|m| m.to_json()).collect();
    assert_eq!(
        json,
        vec![
            json!({"sab": "SENNET", "code": "C020077", "term": "Female"}),
            json!({"sab": "SNOMEDCT_US", "code": "248153007", "term": "Male"}),
        ]
    );

    let executed = backend.executed();
    assert_eq!(executed[0].params.get("seed_parent_code"), Some(&Value::from("C020076")));
    assert!(!executed[0].text.contains("C020076"));
}

#[tokio::test]
async fn test_value_set_without_children_rejected_before_execution() {
    let backend = MemoryBackend::new();
    let err = service(&backend)
        .compose_and_run(ResourceFamily::ValueSet, &filters(&[("parent_sab", "SENNET"), ("parent_code", "C020076")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(backend.executed().is_empty());
}

// ============================================================================
// Gene symbol relationships
// ============================================================================

#[tokio::test]
async fn test_relationships_for_target_symbol() {
    let backend = MemoryBackend::new();
    backend.on(
        ["AS approved_symbols"],
        vec![ResultRow::new()
            .with("hgnc_id", "HGNC:7178")
            .with("approved_symbols", vec!["MMRN1"])
            .with("previous_symbols", vec!["MMRN"])
            .with("alias_symbols", vec!["ECM", "EMILIN4"])],
    );
    let found = service(&backend)
        .compose_and_run(ResourceFamily::Relationships, &filters(&[("target_symbol", "Emilin4")]))
        .await
        .unwrap();
    assert_eq!(
        found[0].to_json(),
        json!({
            "symbol-approved": ["MMRN1"],
            "symbol-previous": ["MMRN"],
            "symbol-alias": ["ECM", "EMILIN4"],
        })
    );
    assert_eq!(backend.executed()[0].params.get("filter_0"), Some(&Value::from(vec!["emilin4"])));
}

#[tokio::test]
async fn test_unknown_target_symbol_is_empty() {
    let backend = MemoryBackend::new();
    let err = service(&backend)
        .compose_and_run(ResourceFamily::Relationships, &filters(&[("target_symbol", "NOPE1")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Empty(_)));
}
