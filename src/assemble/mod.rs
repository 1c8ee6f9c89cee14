//! # Result Assembly
//!
//! Raw rows in, response shapes out: dedup on a natural key, decode each
//! surviving row, wrap list pages in their envelope.

use hashbrown::HashSet;
use tracing::trace;

use crate::decode::{decode_row, FieldShape};
use crate::decode::scalar;
use crate::execution::ResultRow;
use crate::model::DomainObject;
use crate::pagination::{PagePlan, PageRequest, PageResult};
use crate::Result;

/// Keep the first row for each value of `key`, in first-seen order.
///
/// The same entity can arrive several times when it is reachable through
/// more than one relationship path.
pub fn dedup_by_key(rows: Vec<ResultRow>, key: &str) -> Result<Vec<ResultRow>> {
    let mut seen: HashSet<String> = HashSet::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        let k = scalar(row.cell(key)?);
        if seen.insert(k) {
            kept.push(row);
        } else {
            trace!(key, "dropped duplicate row");
        }
    }
    Ok(kept)
}

/// Decode every row with `shape`.
pub fn assemble_detail(rows: &[ResultRow], shape: &FieldShape) -> Result<Vec<DomainObject>> {
    rows.iter().map(|row| decode_row(shape, row)).collect()
}

/// Decode one page of rows and wrap it with its pagination block.
pub fn assemble_page(
    rows: &[ResultRow],
    shape: &FieldShape,
    plan: &PagePlan,
    request: &PageRequest,
    items_key: &'static str,
) -> Result<PageResult<DomainObject>> {
    let items = assemble_detail(rows, shape)?;
    Ok(PageResult::new(plan, request, items_key, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::FieldRule;
    use crate::model::DomainValue;
    use crate::pagination::PageSelector;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dedup_keeps_first_seen() {
        let rows = vec![
            ResultRow::new().with("name", "age").with("derived", "a"),
            ResultRow::new().with("name", "sex").with("derived", "b"),
            ResultRow::new().with("name", "age").with("derived", "c"),
        ];
        let kept = dedup_by_key(rows, "name").unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].get::<String>("derived").unwrap(), "a");
        assert_eq!(kept[1].get::<String>("name").unwrap(), "sex");
    }

    #[test]
    fn test_dedup_on_unknown_column_fails() {
        let rows = vec![ResultRow::new().with("name", "age")];
        assert!(dedup_by_key(rows, "nope").is_err());
    }

    #[test]
    fn test_page_envelope() {
        let shape = FieldShape::new().field("id", "id", FieldRule::Scalar);
        let rows = vec![ResultRow::new().with("id", "CL:1")];
        let request = PageRequest::new(PageSelector::First, 10, "").unwrap();
        let plan = PagePlan::resolve(&request, 1);
        let page = assemble_page(&rows, &shape, &plan, &request, "cell_types").unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].get("id"), Some(&DomainValue::from("CL:1")));
        assert_eq!(page.items_key, "cell_types");
    }
}
