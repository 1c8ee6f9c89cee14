//! End-to-end tests for paged list requests: the count query, page
//! resolution, the windowed page query and the response envelope.

use std::time::Duration;

use hs_ontology::storage::MemoryBackend;
use hs_ontology::{
    Error, GraphHandle, OntologyConfig, OntologyService, PageRequest, PageSelector, ResourceFamily, ResultRow,
    Value,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn cell_types(n: usize) -> Vec<ResultRow> {
    (0..n)
        .map(|i| {
            ResultRow::new()
                .with("cl_id", format!("CL:{:07}", i))
                .with("term", format!("cell {i:02}"))
                .with("synonyms", Vec::<String>::new())
                .with("definition", vec![format!("CL|definition {i}")])
        })
        .collect()
}

fn scripted(total: u64, rows: Vec<ResultRow>) -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.on(["total_count"], vec![ResultRow::new().with("total_count", total)]);
    backend.on(["SKIP $skip"], rows);
    backend
}

fn service(backend: &MemoryBackend) -> OntologyService<MemoryBackend> {
    let graph = GraphHandle::with_backend(backend.clone(), Duration::from_secs(5));
    OntologyService::new(graph, OntologyConfig::default()).unwrap()
}

// ============================================================================
// Count first
// ============================================================================

#[tokio::test]
async fn test_zero_count_issues_only_the_count_query() {
    let backend = scripted(0, cell_types(3));
    let request = PageRequest::new(PageSelector::First, 10, "zz").unwrap();
    let err = service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap_err();

    assert!(matches!(err, Error::Empty(_)));
    let executed = backend.executed();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].text.ends_with("AS total_count"));
}

#[tokio::test]
async fn test_count_and_page_share_filters() {
    let backend = scripted(3, cell_types(3));
    let request = PageRequest::new(PageSelector::First, 10, "Cell").unwrap();
    service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap();

    let executed = backend.executed();
    assert_eq!(executed.len(), 2);
    for q in &executed {
        assert!(q.text.contains("toLower(term) STARTS WITH $filter_0"));
        assert_eq!(q.params.get("filter_0"), Some(&Value::from("cell")));
    }
    assert!(!executed[0].params.contains_key("skip"));
    assert_eq!(executed[1].params.get("skip"), Some(&Value::Int(0)));
    assert_eq!(executed[1].params.get("limit"), Some(&Value::Int(10)));
}

// ============================================================================
// Page resolution
// ============================================================================

async fn skip_for(selector: PageSelector) -> (u64, Value) {
    let backend = scripted(25, cell_types(25));
    let request = PageRequest::new(selector, 10, "").unwrap();
    let page = service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap();
    let skip = backend.executed()[1].params.get("skip").cloned().unwrap_or(Value::Null);
    (page.pagination.page, skip)
}

#[tokio::test]
async fn test_page_selectors_resolve_against_total() {
    assert_eq!(skip_for(PageSelector::Number(0)).await, (1, Value::Int(0)));
    assert_eq!(skip_for(PageSelector::First).await, (1, Value::Int(0)));
    assert_eq!(skip_for(PageSelector::Number(2)).await, (2, Value::Int(10)));
    assert_eq!(skip_for(PageSelector::Number(99)).await, (3, Value::Int(20)));
    assert_eq!(skip_for(PageSelector::Last).await, (3, Value::Int(20)));
}

#[tokio::test]
async fn test_last_page_is_partial() {
    let backend = scripted(25, cell_types(25));
    let request = PageRequest::parse(Some("last"), Some("10"), None, 50).unwrap();
    let page = service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.item_count, 25);
}

#[tokio::test]
async fn test_repeated_key_in_page_window_collapses() {
    let rows = cell_types(3);
    let straddling = vec![rows[0].clone(), rows[1].clone(), rows[1].clone(), rows[1].clone(), rows[2].clone()];
    let backend = scripted(3, straddling);
    let request = PageRequest::new(PageSelector::Number(2), 2, "cell").unwrap();
    let page = service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap();

    let ids: Vec<_> = page.items.iter().map(|c| c.to_json()["id"].clone()).collect();
    assert_eq!(ids, vec![json!("CL:0000001")]);
    assert_eq!(page.pagination.item_count, 3);

    // Every property sub-scope aggregates, so the engine yields one row per cell type.
    let page_query = &backend.executed()[1].text;
    for line in page_query.lines().filter(|l| l.starts_with("CALL { WITH")) {
        assert!(line.contains("COLLECT(") || line.contains("count("), "{line}");
    }
}

// ============================================================================
// Envelope
// ============================================================================

#[tokio::test]
async fn test_envelope_json() {
    let backend = scripted(2, cell_types(2));
    let request = PageRequest::new(PageSelector::First, 10, "Cell").unwrap();
    let page = service(&backend).compose_and_run_paged(ResourceFamily::CellTypes, &request).await.unwrap();

    assert_eq!(
        page.to_json(),
        json!({
            "pagination": {
                "page": 1, "total_pages": 1, "items_per_page": 10, "starts_with": "Cell", "item_count": 2
            },
            "cell_types": [
                {"id": "CL:0000000", "term": "cell 00", "synonyms": [], "definition": "definition 0"},
                {"id": "CL:0000001", "term": "cell 01", "synonyms": [], "definition": "definition 1"},
            ],
        })
    );
}

#[tokio::test]
async fn test_family_without_list_form_is_rejected() {
    let backend = MemoryBackend::new();
    let request = PageRequest::new(PageSelector::First, 10, "").unwrap();
    let err = service(&backend).compose_and_run_paged(ResourceFamily::Organs, &request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
    assert!(backend.executed().is_empty());
}

#[tokio::test]
async fn test_malformed_page_input_rejected() {
    assert!(matches!(PageRequest::parse(Some("second"), None, None, 10), Err(Error::InvalidRequest(_))));
    assert!(matches!(PageRequest::parse(None, Some("ten"), None, 10), Err(Error::InvalidRequest(_))));
    assert!(matches!(PageRequest::parse(None, Some("0"), None, 10), Err(Error::InvalidRequest(_))));
}

proptest! {
    #[test]
    fn prop_page_window_stays_inside_result(total in 1u64..500, per in 1u64..50, page in 0u64..100) {
        let request = PageRequest::new(PageSelector::Number(page), per, "").unwrap();
        let plan = hs_ontology::pagination::PagePlan::resolve(&request, total);
        prop_assert!(plan.page >= 1 && plan.page <= plan.total_pages);
        prop_assert!(plan.skip < total);
        prop_assert_eq!(plan.skip % per, 0);
    }
}
