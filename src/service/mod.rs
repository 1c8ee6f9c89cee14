//! # Ontology Service
//!
//! The two entry points callers use. Each call derives its answer from
//! scratch: describe the family, compose, execute, dedup, decode.
//!
//! ```text
//! compose_and_run:        filters ──→ rows query ──→ dedup ──→ detail shape
//! compose_and_run_paged:  prefix  ──→ count query ──→ PagePlan
//!                                 ──→ page query  ──→ dedup ──→ list shape + envelope
//! ```

use std::sync::Arc;

use tracing::{debug, warn};

use crate::assemble::{assemble_detail, assemble_page, dedup_by_key};
use crate::config::OntologyConfig;
use crate::cypher::COUNT_COLUMN;
use crate::model::DomainObject;
use crate::pagination::{PagePlan, PageRequest, PageResult};
use crate::resources::{ResourceDescriptor, ResourceFamily};
use crate::storage::GraphBackend;
use crate::{Error, GraphHandle, Result};

pub use crate::resources::NamedFilters;

/// Request-scoped query service over a shared graph handle.
pub struct OntologyService<B: GraphBackend> {
    graph: GraphHandle<B>,
    config: Arc<OntologyConfig>,
}

impl<B: GraphBackend> Clone for OntologyService<B> {
    fn clone(&self) -> Self {
        Self { graph: self.graph.clone(), config: Arc::clone(&self.config) }
    }
}

impl<B: GraphBackend> OntologyService<B> {
    pub fn new(graph: GraphHandle<B>, config: OntologyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { graph, config: Arc::new(config) })
    }

    pub fn graph(&self) -> &GraphHandle<B> {
        &self.graph
    }

    pub fn config(&self) -> &OntologyConfig {
        &self.config
    }

    pub fn descriptor(&self, family: ResourceFamily) -> Result<ResourceDescriptor> {
        ResourceDescriptor::for_family(family, &self.config)
    }

    /// Every entity of `family` matching `filters`, in display order.
    ///
    /// Fails with [`Error::Empty`] when nothing matches, unless the family
    /// treats no match as an empty result (value sets).
    pub async fn compose_and_run(&self, family: ResourceFamily, filters: &NamedFilters) -> Result<Vec<DomainObject>> {
        let descriptor = self.descriptor(family)?;
        let query = descriptor.composer(filters)?.build()?;
        debug!(%family, text = %query.text, columns = ?query.columns, "composed detail query");

        let result = self.graph.run(&query).await?;
        let rows = dedup_by_key(result.rows, descriptor.natural_key())?;
        if rows.is_empty() {
            if descriptor.allows_empty() {
                debug!(%family, "no match, empty result");
                return Ok(Vec::new());
            }
            return Err(Error::Empty(format!("no {family} match the given filters")));
        }
        assemble_detail(&rows, descriptor.detail_shape())
    }

    /// One page of the list form of `family`.
    ///
    /// The count runs first with the same filters. A zero count fails with
    /// [`Error::Empty`] and the page query is never issued.
    pub async fn compose_and_run_paged(
        &self,
        family: ResourceFamily,
        request: &PageRequest,
    ) -> Result<PageResult<DomainObject>> {
        let descriptor = self.descriptor(family)?;
        let (composer, list) = descriptor.list_composer(request)?;

        let count_query = composer.build_count()?;
        debug!(%family, text = %count_query.text, "composed count query");
        let counted = self.graph.run(&count_query).await?;
        let total = match counted.rows.first() {
            Some(row) => row.get::<u64>(COUNT_COLUMN)?,
            None => 0,
        };
        if total == 0 {
            return Err(Error::Empty(match request.prefix() {
                Some(prefix) => format!("no {family} start with '{prefix}'"),
                None => format!("no {family} found"),
            }));
        }

        let plan = PagePlan::resolve(request, total);
        let page_query = composer.build_page(plan.skip, plan.limit())?;
        debug!(%family, page = plan.page, skip = plan.skip, limit = plan.limit(), "composed page query");
        let result = self.graph.run(&page_query).await?;
        let fetched = result.rows.len();
        let rows = dedup_by_key(result.rows, descriptor.natural_key())?;
        if rows.len() < fetched {
            warn!(%family, fetched, kept = rows.len(), "page repeated a natural key; page is short");
        }
        assemble_page(&rows, &list.shape, &plan, request, list.items_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ResultRow;
    use crate::pagination::PageSelector;
    use crate::storage::MemoryBackend;
    use std::time::Duration;

    fn service(backend: &MemoryBackend) -> OntologyService<MemoryBackend> {
        let graph = GraphHandle::with_backend(backend.clone(), Duration::from_secs(1));
        OntologyService::new(graph, OntologyConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_no_rows_is_empty() {
        let backend = MemoryBackend::new();
        let err = service(&backend)
            .compose_and_run(ResourceFamily::Organs, &NamedFilters::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Empty(_)));
    }

    #[tokio::test]
    async fn test_zero_count_skips_page_query() {
        let backend = MemoryBackend::new();
        backend.on(["total_count"], vec![ResultRow::new().with(COUNT_COLUMN, 0)]);
        let request = PageRequest::new(PageSelector::First, 10, "zz").unwrap();
        let err = service(&backend)
            .compose_and_run_paged(ResourceFamily::Genes, &request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Empty(_)));
        assert_eq!(backend.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_value_set_is_not_an_error() {
        let backend = MemoryBackend::new();
        let mut filters = NamedFilters::new();
        filters.insert("parent_sab".into(), vec!["SENNET".into()]);
        filters.insert("parent_code".into(), vec!["C020076".into()]);
        filters.insert("child_sabs".into(), vec!["SENNET".into()]);
        let sets = service(&backend).compose_and_run(ResourceFamily::ValueSet, &filters).await.unwrap();
        assert!(sets.is_empty());
        assert_eq!(backend.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let graph = GraphHandle::with_backend(MemoryBackend::new(), Duration::from_secs(1));
        let config = OntologyConfig { timeout_secs: 0, ..Default::default() };
        assert!(matches!(OntologyService::new(graph, config), Err(Error::Configuration(_))));
    }
}
