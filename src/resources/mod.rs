//! # Resource Families
//!
//! One descriptor per family: the composer that finds its entities, the
//! named filters it accepts, the natural key rows are deduplicated on, and
//! the shapes its rows decode into.
//!
//! ```text
//! ResourceFamily ──→ ResourceDescriptor ──composer(filters)──→ QueryComposer
//!                          │
//!                          └── detail / list FieldShape
//! ```

pub mod decoders;
pub mod families;
pub mod schema;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::OntologyConfig;
use crate::cypher::{Filter, FilterOp, QueryComposer, Seed, Target};
use crate::decode::FieldShape;
use crate::model::Value;
use crate::pagination::PageRequest;
use crate::{Error, Result};

/// Named string filters, already validated by the caller. A name may carry
/// several values.
pub type NamedFilters = BTreeMap<String, Vec<String>>;

/// The kinds of entity the service answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFamily {
    AssayTypes,
    Genes,
    Proteins,
    CellTypes,
    Organs,
    FieldDescriptions,
    FieldTypes,
    FieldSchemas,
    FieldEntities,
    AssayClasses,
    DatasetTypes,
    ValueSet,
    Relationships,
}

impl ResourceFamily {
    pub const ALL: [ResourceFamily; 13] = [
        ResourceFamily::AssayTypes,
        ResourceFamily::Genes,
        ResourceFamily::Proteins,
        ResourceFamily::CellTypes,
        ResourceFamily::Organs,
        ResourceFamily::FieldDescriptions,
        ResourceFamily::FieldTypes,
        ResourceFamily::FieldSchemas,
        ResourceFamily::FieldEntities,
        ResourceFamily::AssayClasses,
        ResourceFamily::DatasetTypes,
        ResourceFamily::ValueSet,
        ResourceFamily::Relationships,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ResourceFamily::AssayTypes => "assay-types",
            ResourceFamily::Genes => "genes",
            ResourceFamily::Proteins => "proteins",
            ResourceFamily::CellTypes => "cell-types",
            ResourceFamily::Organs => "organs",
            ResourceFamily::FieldDescriptions => "field-descriptions",
            ResourceFamily::FieldTypes => "field-types",
            ResourceFamily::FieldSchemas => "field-schemas",
            ResourceFamily::FieldEntities => "field-entities",
            ResourceFamily::AssayClasses => "assay-classes",
            ResourceFamily::DatasetTypes => "dataset-types",
            ResourceFamily::ValueSet => "valueset",
            ResourceFamily::Relationships => "relationships",
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResourceFamily::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| Error::InvalidRequest(format!("unknown resource family '{s}'")))
    }
}

/// How a named filter value becomes a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterBinding {
    /// Exact match. Several values match any of them.
    Exact(Target),
    /// Case-insensitive match. Several values match any of them.
    IgnoreCase(Target),
    /// `true` or `false`, in any case.
    Flag(Target),
    /// `iec` selects the context's own pipeline, anything else an
    /// external provider.
    Provider(Target),
    /// Identifier matched against several columns. Bare numbers get
    /// `code_prefix` first.
    Identifier { targets: Vec<Target>, code_prefix: &'static str },
    /// Records of a list column that start with `<value><separator>`.
    RecordPrefix { target: Target, separator: &'static str },
    /// A data type name, with or without its `xsd:` prefix.
    TypeName(Target),
    /// A code given bare (`C200001`) or with the context (`HUBMAP:C200001`),
    /// or a name, matched case-insensitively against every target.
    ContextCode(Vec<Target>),
    /// Read by the family's seed; adds no predicate.
    Seed,
}

impl FilterBinding {
    fn multi_valued(&self) -> bool {
        matches!(
            self,
            FilterBinding::Exact(_)
                | FilterBinding::IgnoreCase(_)
                | FilterBinding::Identifier { .. }
                | FilterBinding::Seed
        )
    }

    /// Build the predicate for `values`. `None` when no value is given.
    pub fn bind(&self, name: &str, values: &[String], context: &str) -> Result<Option<Filter>> {
        let values: Vec<&str> = values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
        let Some(first) = values.first().copied() else {
            return Ok(None);
        };
        if values.len() > 1 && !self.multi_valued() {
            return Err(Error::InvalidRequest(format!("filter '{name}' takes a single value")));
        }

        let filter = match self {
            FilterBinding::Seed => return Ok(None),
            FilterBinding::Exact(t) if values.len() == 1 => Filter::equals(t.clone(), first),
            FilterBinding::Exact(t) => Filter::one_of(t.clone(), values),
            FilterBinding::IgnoreCase(t) if values.len() == 1 => Filter::equals_ignore_case(t.clone(), first),
            FilterBinding::IgnoreCase(t) => Filter::one_of_ignore_case(t.clone(), values),
            FilterBinding::Flag(t) => {
                let flag = if first.eq_ignore_ascii_case("true") {
                    true
                } else if first.eq_ignore_ascii_case("false") {
                    false
                } else {
                    return Err(Error::InvalidRequest(format!(
                        "filter '{name}' must be 'true' or 'false', got '{first}'"
                    )));
                };
                Filter::equals(t.clone(), Value::Bool(flag))
            }
            FilterBinding::Provider(t) => {
                let provider = if first.eq_ignore_ascii_case("iec") {
                    schema::iec_provider(context)
                } else {
                    schema::EXTERNAL_PROVIDER.to_owned()
                };
                Filter::equals_ignore_case(t.clone(), &provider)
            }
            FilterBinding::Identifier { targets, code_prefix } => {
                let ids: Vec<String> = values
                    .iter()
                    .map(|v| {
                        if v.chars().all(|c| c.is_ascii_digit()) {
                            format!("{code_prefix}{v}")
                        } else {
                            (*v).to_owned()
                        }
                    })
                    .map(|v| v.to_lowercase())
                    .collect();
                Filter::any(targets.iter().cloned(), FilterOp::OneOfIgnoreCase(ids))
            }
            FilterBinding::RecordPrefix { target, separator } => {
                Filter::starts_with([target.clone()], &format!("{first}{separator}"))
            }
            FilterBinding::TypeName(t) => {
                let bare = first.strip_prefix("xsd:").unwrap_or(first);
                Filter::one_of_ignore_case(t.clone(), [bare.to_owned(), format!("xsd:{bare}")])
            }
            FilterBinding::ContextCode(targets) => {
                let ids = vec![first.to_lowercase(), format!("{context}:{first}").to_lowercase()];
                Filter::any(targets.iter().cloned(), FilterOp::OneOfIgnoreCase(ids))
            }
        };
        Ok(Some(filter))
    }
}

/// List (`*-info`) form of a family.
#[derive(Debug, Clone)]
pub struct ListShape {
    /// Key of the items array in the page envelope.
    pub items_key: &'static str,
    /// Columns a type-ahead prefix is matched against.
    pub prefix: Vec<Target>,
    pub shape: FieldShape,
}

/// Builds a family's seed from the request's filters.
pub type SeedFactory = fn(&NamedFilters) -> Result<Seed>;

/// Everything needed to query and decode one family.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    family: ResourceFamily,
    context: String,
    composer: QueryComposer,
    natural_key: &'static str,
    filters: Vec<(&'static str, FilterBinding)>,
    required: Vec<&'static str>,
    seed: Option<SeedFactory>,
    empty_ok: bool,
    detail: FieldShape,
    list: Option<ListShape>,
}

impl ResourceDescriptor {
    pub(crate) fn new(
        family: ResourceFamily,
        context: String,
        composer: QueryComposer,
        natural_key: &'static str,
        detail: FieldShape,
    ) -> Self {
        Self {
            family,
            context,
            composer: composer.natural_key(natural_key),
            natural_key,
            filters: Vec::new(),
            required: Vec::new(),
            seed: None,
            empty_ok: false,
            detail,
            list: None,
        }
    }

    pub(crate) fn filter(mut self, name: &'static str, binding: FilterBinding) -> Self {
        self.filters.push((name, binding));
        self
    }

    pub(crate) fn list(mut self, list: ListShape) -> Self {
        self.list = Some(list);
        self
    }

    /// Reject requests that do not give `name` a non-blank value.
    pub(crate) fn require(mut self, name: &'static str) -> Self {
        self.required.push(name);
        self
    }

    /// Build the seed per request instead of using the declared one.
    pub(crate) fn seeded_by(mut self, factory: SeedFactory) -> Self {
        self.seed = Some(factory);
        self
    }

    /// No match is an empty result, not [`Error::Empty`].
    pub(crate) fn empty_ok(mut self) -> Self {
        self.empty_ok = true;
        self
    }

    /// Descriptor of `family` under `config`.
    pub fn for_family(family: ResourceFamily, config: &OntologyConfig) -> Result<Self> {
        families::describe(family, config)
    }

    pub fn family(&self) -> ResourceFamily {
        self.family
    }

    /// Raw column rows are deduplicated on.
    pub fn natural_key(&self) -> &'static str {
        self.natural_key
    }

    pub fn detail_shape(&self) -> &FieldShape {
        &self.detail
    }

    pub fn list_shape(&self) -> Option<&ListShape> {
        self.list.as_ref()
    }

    pub fn filter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().map(|(n, _)| *n)
    }

    pub fn required_filters(&self) -> &[&'static str] {
        &self.required
    }

    pub fn allows_empty(&self) -> bool {
        self.empty_ok
    }

    /// Composer with `filters` applied. Unknown filter names are rejected,
    /// as are requests missing a required filter.
    pub fn composer(&self, filters: &NamedFilters) -> Result<QueryComposer> {
        for name in &self.required {
            let given = filters.get(*name).is_some_and(|vs| vs.iter().any(|v| !v.trim().is_empty()));
            if !given {
                return Err(Error::InvalidRequest(format!("{} needs filter '{name}'", self.family)));
            }
        }
        let mut composer = self.composer.clone();
        if let Some(factory) = self.seed {
            composer = composer.with_seed(factory(filters)?);
        }
        for (name, values) in filters {
            let binding = self
                .filters
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .map(|(_, b)| b)
                .ok_or_else(|| {
                    Error::InvalidRequest(format!("{} does not accept filter '{name}'", self.family))
                })?;
            if let Some(filter) = binding.bind(name, values, &self.context)? {
                composer = composer.filter(filter);
            }
        }
        Ok(composer)
    }

    /// Composer for the list form with the request's prefix applied.
    pub fn list_composer(&self, request: &PageRequest) -> Result<(QueryComposer, &ListShape)> {
        let list = self.list.as_ref().ok_or_else(|| {
            Error::InvalidRequest(format!("{} has no list form", self.family))
        })?;
        let mut composer = self.composer.clone();
        if let Some(prefix) = request.prefix() {
            composer = composer.filter(Filter::starts_with(list.prefix.iter().cloned(), &prefix));
        }
        Ok((composer, list))
    }
}
