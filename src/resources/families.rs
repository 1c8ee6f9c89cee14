//! Family definitions.
//!
//! Each function wires a seed, its property fragments and its shapes. Names
//! of the aliases are the names of the raw columns the shapes read.

use crate::config::OntologyConfig;
use crate::cypher::fragment::VITESSCE_HINT_LABEL;
use crate::cypher::{PropertyFragment, QueryComposer, RecordPart, Seed, Target};
use crate::decode::{FieldRule, FieldShape};
use crate::model::RelType;
use crate::Result;

use super::decoders::{biomarker, definition_text, is_multiassay, marked_cell_type, organ, protein_references};
use super::schema::*;
use super::{FilterBinding, ListShape, NamedFilters, ResourceDescriptor, ResourceFamily};
use crate::Error;

pub(super) fn describe(family: ResourceFamily, config: &OntologyConfig) -> Result<ResourceDescriptor> {
    match family {
        ResourceFamily::AssayTypes => assay_types(config),
        ResourceFamily::Genes => genes(config),
        ResourceFamily::Proteins => proteins(config),
        ResourceFamily::CellTypes => cell_types(config),
        ResourceFamily::Organs => organs(config),
        ResourceFamily::FieldDescriptions => field_descriptions(config),
        ResourceFamily::FieldTypes => field_types(config),
        ResourceFamily::FieldSchemas => field_schemas(config),
        ResourceFamily::FieldEntities => field_entities(config),
        ResourceFamily::AssayClasses => assay_classes(config),
        ResourceFamily::DatasetTypes => dataset_types(config),
        ResourceFamily::ValueSet => value_set(config),
        ResourceFamily::Relationships => gene_relationships(config),
    }
}

// ============================================================================
// Dataset classification
// ============================================================================

/// Data types under the context's dataset root. Dataset-level properties
/// hang off the dataset type that has the data type.
fn assay_types(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let ctx = config.context();
    let seed = Seed::root_subset(&ctx, &config.schema.dataset_root_code, "data_typeCUI", "data_type").any_isa_source();
    let composer = QueryComposer::new(seed)
        .fragment(PropertyFragment::related_concept(&ctx, "data_typeCUI", HAS_DATA_TYPE, "DatasetCUI")?.incoming())
        .fragment(PropertyFragment::relationship(&ctx, "DatasetCUI", HAS_DISPLAY_NAME, "description")?)
        .fragment(PropertyFragment::synonym(&ctx, "data_typeCUI", "alt_names", true)?)
        .fragment(PropertyFragment::hierarchy(&ctx, "DatasetCUI", "primary", DATASET_ORDER_CODES)?)
        .fragment(PropertyFragment::relationship(&ctx, "DatasetCUI", PROVIDED_BY, "dataset_provider")?)
        .fragment(PropertyFragment::boolean(&ctx, "DatasetCUI", ISA, "vis_only", [VIS_ONLY_CODE])?)
        .fragment(PropertyFragment::boolean(&ctx, "DatasetCUI", CONTAINS, "contains_pii", [CONTAINS_PII_CODE])?)
        .fragment(PropertyFragment::relationship(&ctx, "data_typeCUI", VITESSCE_HINT_LABEL, "vitessce_hints")?.collect())
        .returns([
            "data_type",
            "description",
            "alt_names",
            "primary",
            "dataset_provider",
            "vis_only",
            "contains_pii",
            "vitessce_hints",
        ]);

    let detail = FieldShape::new()
        .field("data_type", "data_type", FieldRule::Scalar)
        .field("description", "description", FieldRule::Scalar)
        .field("alt-names", "alt_names", FieldRule::StringList)
        .field("primary", "primary", FieldRule::Flag)
        .field("dataset_provider", "dataset_provider", FieldRule::Scalar)
        .field("vis-only", "vis_only", FieldRule::Flag)
        .field("contains-pii", "contains_pii", FieldRule::Flag)
        .field("vitessce-hints", "vitessce_hints", FieldRule::StringList);

    Ok(ResourceDescriptor::new(ResourceFamily::AssayTypes, ctx, composer, "data_type", detail)
        .filter("data_type", FilterBinding::Exact(Target::scalar("data_type")))
        .filter("description", FilterBinding::Exact(Target::scalar("description")))
        .filter("alt_name", FilterBinding::Exact(Target::list("alt_names")))
        .filter("primary", FilterBinding::Flag(Target::scalar("primary")))
        .filter("vis_only", FilterBinding::Flag(Target::scalar("vis_only")))
        .filter("contains_pii", FilterBinding::Flag(Target::scalar("contains_pii")))
        .filter("vitessce_hint", FilterBinding::Exact(Target::list("vitessce_hints")))
        .filter("dataset_provider", FilterBinding::Provider(Target::scalar("dataset_provider"))))
}

/// Properties of a dataset type, read from `input`.
fn dataset_type_fragments(ctx: &str, input: &str) -> Result<Vec<PropertyFragment>> {
    Ok(vec![
        PropertyFragment::relationship(ctx, input, HAS_PDR_CATEGORY, "pdr_category")?,
        PropertyFragment::relationship(ctx, input, HAS_FIG2_AGGREGATED_ASSAYTYPE, "fig2_aggregated_assaytype")?,
        PropertyFragment::relationship(ctx, input, HAS_FIG2_MODALITY, "fig2_modality")?,
        PropertyFragment::relationship(ctx, input, HAS_FIG2_CATEGORY, "fig2_category")?,
    ])
}

fn dataset_type_shape() -> FieldShape {
    FieldShape::new()
        .field("dataset_type", "dataset_type", FieldRule::Scalar)
        .field("PDR_category", "pdr_category", FieldRule::Scalar)
        .nested(
            "fig2",
            FieldShape::new()
                .field("aggregated_assaytype", "fig2_aggregated_assaytype", FieldRule::Scalar)
                .field("modality", "fig2_modality", FieldRule::Scalar)
                .field("category", "fig2_category", FieldRule::Scalar),
        )
}

const DATASET_TYPE_COLUMNS: [&str; 5] =
    ["dataset_type", "pdr_category", "fig2_aggregated_assaytype", "fig2_modality", "fig2_category"];

/// Rule-based dataset kinds. Each rule code carries the assay type it
/// classifies, its processing state and the dataset type it belongs to.
fn assay_classes(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let ctx = config.context();
    let seed = Seed::root_subset(&ctx, &config.schema.assay_class_root_code, "AssayClassCUI", "rule_description")
        .with_code_id("rule_code");
    let composer = QueryComposer::new(seed)
        .fragment(
            PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_ASSAYTYPE, "assaytype")?
                .strip_suffix(ASSAYTYPE_SUFFIX)?,
        )
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_PROCESS_STATE, "process_state")?)
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_PIPELINE_SHORTHAND, "pipeline_shorthand")?)
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_DESCRIPTION, "description")?)
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_ACTIVE_STATUS, "active_status")?)
        .fragment(
            PropertyFragment::relationship(&ctx, "AssayClassCUI", MUST_CONTAIN, "must_contain")?
                .strip_suffix(ASSAYTYPE_SUFFIX)?
                .collect(),
        )
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", VITESSCE_HINT_LABEL, "vitessce_hints")?.collect())
        .fragment(PropertyFragment::boolean(
            &ctx,
            "AssayClassCUI",
            CONTAINS,
            "contains_full_genetic_sequences",
            [CONTAINS_PII_CODE],
        )?)
        .fragment(PropertyFragment::related_concept(&ctx, "AssayClassCUI", HAS_DATASET_TYPE, "DatasetTypeCUI")?)
        .fragment(PropertyFragment::relationship(&ctx, "AssayClassCUI", HAS_DATASET_TYPE, "dataset_type")?)
        .fragments(dataset_type_fragments(&ctx, "DatasetTypeCUI")?)
        .returns(
            [
                "rule_code",
                "rule_description",
                "assaytype",
                "process_state",
                "pipeline_shorthand",
                "description",
                "active_status",
                "must_contain",
                "vitessce_hints",
                "contains_full_genetic_sequences",
            ]
            .into_iter()
            .chain(DATASET_TYPE_COLUMNS),
        );

    let detail = FieldShape::new()
        .nested(
            "rule_description",
            FieldShape::new()
                .field("code", "rule_code", FieldRule::Scalar)
                .field("name", "rule_description", FieldRule::Scalar),
        )
        .nested(
            "value",
            FieldShape::new()
                .field("assaytype", "assaytype", FieldRule::Scalar)
                .field("process_state", "process_state", FieldRule::Scalar)
                .field("pipeline_shorthand", "pipeline_shorthand", FieldRule::Scalar)
                .field("description", "description", FieldRule::Scalar)
                .field("active_status", "active_status", FieldRule::Scalar)
                .derived("is_multiassay", is_multiassay)
                .field("must_contain", "must_contain", FieldRule::StringList)
                .field("vitessce_hints", "vitessce_hints", FieldRule::StringList)
                .field("contains_full_genetic_sequences", "contains_full_genetic_sequences", FieldRule::Flag)
                .nested("dataset_type", dataset_type_shape()),
        );

    let assay_class = vec![Target::scalar("rule_code"), Target::scalar("rule_description")];
    Ok(ResourceDescriptor::new(ResourceFamily::AssayClasses, ctx, composer, "rule_code", detail)
        .filter("assayclass", FilterBinding::ContextCode(assay_class))
        .filter("process_state", FilterBinding::IgnoreCase(Target::scalar("process_state")))
        .filter("assaytype", FilterBinding::Exact(Target::scalar("assaytype"))))
}

fn dataset_types(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let ctx = config.context();
    let seed = Seed::root_subset(&ctx, &config.schema.dataset_type_root_code, "DatasetTypeCUI", "dataset_type");
    let composer = QueryComposer::new(seed)
        .fragments(dataset_type_fragments(&ctx, "DatasetTypeCUI")?)
        .fragment(PropertyFragment::boolean(
            &ctx,
            "DatasetTypeCUI",
            ISA,
            "is_externally_processed",
            [EXTERNALLY_PROCESSED_CODE],
        )?)
        .returns(DATASET_TYPE_COLUMNS.into_iter().chain(["is_externally_processed"]));

    let detail = dataset_type_shape().field("is_externally_processed", "is_externally_processed", FieldRule::Flag);

    Ok(ResourceDescriptor::new(ResourceFamily::DatasetTypes, ctx, composer, "DatasetTypeCUI", detail)
        .filter("dataset_type", FilterBinding::Exact(Target::scalar("dataset_type")))
        .filter("is_externally_processed", FilterBinding::Flag(Target::scalar("is_externally_processed"))))
}

/// Organs under the organ root. The root lives in its own vocabulary while
/// the organ codes belong to the context.
fn organs(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let ctx = config.context();
    let seed = Seed::root_subset(&ctx, &config.schema.organ_root_code, "OrganCUI", "term")
        .rooted_in(&config.schema.organ_root_vocabulary)
        .term_from_code()
        .with_code("code")
        .with_code_sab("sab");
    let composer = QueryComposer::new(seed)
        .fragment(
            PropertyFragment::cross_reference([UBERON], "OrganCUI", "organ_uberon", true)?
                .override_code(SKIN_CUI, SKIN_UBERON),
        )
        .fragment(PropertyFragment::relationship(&ctx, "OrganCUI", HAS_TWO_CHARACTER_CODE, "rui_code")?)
        .returns(["sab", "code", "term", "rui_code", "organ_uberon", "OrganCUI"]);

    let detail = FieldShape::new()
        .field("code", "code", FieldRule::Scalar)
        .field("sab", "sab", FieldRule::Scalar)
        .field("term", "term", FieldRule::Scalar)
        .field("rui_code", "rui_code", FieldRule::Scalar)
        .field("organ_uberon", "organ_uberon", FieldRule::Scalar)
        .field("organ_cui", "OrganCUI", FieldRule::Scalar);

    Ok(ResourceDescriptor::new(ResourceFamily::Organs, ctx, composer, "code", detail))
}

// ============================================================================
// Biomarkers
// ============================================================================

fn genes(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let seed = Seed::vocabulary_codes(HGNC, "GeneCUI").with_code_id("hgnc_id");
    let composer = QueryComposer::new(seed)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "approved_symbol", false)?.term_type(ACRONYM)?)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "approved_name", false)?.term_type(PREFERRED)?)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "previous_symbols", true)?.term_type(PREVIOUS_SYMBOL)?)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "alias_symbols", true)?.term_type(ALIAS_SYMBOL)?)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "previous_names", true)?.term_type(PREVIOUS_NAME)?)
        .fragment(PropertyFragment::synonym(HGNC, "GeneCUI", "alias_names", true)?.term_type(ALIAS_NAME)?)
        .fragment(PropertyFragment::cross_reference(GENE_REFERENCE_SABS, "GeneCUI", "references", true)?)
        .fragment(PropertyFragment::definition([REFSEQ], "GeneCUI", "summaries", true)?)
        .fragment(
            PropertyFragment::relationship(HRA, "GeneCUI", HAS_MARKER_GENE, "cell_types")?
                .incoming()
                .target_sabs([CL])
                .record(vec![
                    RecordPart::CodeId,
                    RecordPart::Term,
                    RecordPart::RelationshipSab,
                    RecordPart::related_codes(LOCATED_IN, HRA, UBERON)?,
                    RecordPart::Definition,
                ])
                .collect(),
        )
        .returns([
            "hgnc_id",
            "approved_symbol",
            "approved_name",
            "previous_symbols",
            "previous_names",
            "alias_symbols",
            "alias_names",
            "references",
            "summaries",
            "cell_types",
        ])
        .order_by("approved_symbol");

    let detail = FieldShape::new()
        .field("hgnc_id", "hgnc_id", FieldRule::Scalar)
        .field("approved_symbol", "approved_symbol", FieldRule::Scalar)
        .field("approved_name", "approved_name", FieldRule::Scalar)
        .field("previous_symbols", "previous_symbols", FieldRule::StringList)
        .field("previous_names", "previous_names", FieldRule::StringList)
        .field("alias_symbols", "alias_symbols", FieldRule::StringList)
        .field("alias_names", "alias_names", FieldRule::StringList)
        .field("references", "references", FieldRule::References)
        .field("summaries", "summaries", FieldRule::CompoundList(&["source", "summary"]))
        .field("cell_types", "cell_types", FieldRule::Each(marked_cell_type));

    let list = ListShape {
        items_key: "genes",
        prefix: vec![Target::scalar("approved_symbol")],
        shape: FieldShape::new()
            .field("hgnc_id", "hgnc_id", FieldRule::Scalar)
            .field("approved_symbol", "approved_symbol", FieldRule::Scalar)
            .field("approved_name", "approved_name", FieldRule::Scalar)
            .field("summary", "summaries", FieldRule::Custom(definition_text)),
    };

    Ok(ResourceDescriptor::new(ResourceFamily::Genes, config.context(), composer, "hgnc_id", detail)
        .filter(
            "id",
            FilterBinding::Identifier {
                targets: vec![
                    Target::scalar("hgnc_id"),
                    Target::scalar("approved_symbol"),
                    Target::list("previous_symbols"),
                    Target::list("alias_symbols"),
                ],
                code_prefix: "HGNC:",
            },
        )
        .list(list))
}

fn proteins(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let seed = Seed::vocabulary_codes(UNIPROTKB, "ProteinCUI").with_code("uniprotkb_id");
    let composer = QueryComposer::new(seed)
        .fragment(PropertyFragment::synonym(UNIPROTKB, "ProteinCUI", "recommended_name", false)?.term_type(PREFERRED)?)
        .fragment(PropertyFragment::synonym(UNIPROTKB, "ProteinCUI", "entry_name", false)?.term_type(ACRONYM)?)
        .fragment(PropertyFragment::synonym(UNIPROTKB, "ProteinCUI", "synonyms", true)?)
        .fragment(PropertyFragment::definition([UNIPROTKB], "ProteinCUI", "description", true)?)
        .returns(["uniprotkb_id", "recommended_name", "entry_name", "synonyms", "description"])
        .order_by("uniprotkb_id");

    let detail = FieldShape::new()
        .field("uniprotkb_id", "uniprotkb_id", FieldRule::Scalar)
        .field("recommended_name", "recommended_name", FieldRule::Scalar)
        .field("entry_name", "entry_name", FieldRule::Scalar)
        .field("synonyms", "synonyms", FieldRule::StringList)
        .derived("references", protein_references);

    let list = ListShape {
        items_key: "proteins",
        prefix: vec![
            Target::scalar("uniprotkb_id"),
            Target::scalar("recommended_name"),
            Target::scalar("entry_name"),
        ],
        shape: FieldShape::new()
            .field("uniprotkb_id", "uniprotkb_id", FieldRule::Scalar)
            .field("recommended_name", "recommended_name", FieldRule::Scalar)
            .field("entry_name", "entry_name", FieldRule::Scalar)
            .field("synonyms", "synonyms", FieldRule::StringList),
    };

    Ok(ResourceDescriptor::new(ResourceFamily::Proteins, config.context(), composer, "uniprotkb_id", detail)
        .filter(
            "id",
            FilterBinding::Identifier {
                targets: vec![Target::scalar("uniprotkb_id"), Target::scalar("entry_name")],
                code_prefix: "",
            },
        )
        .list(list))
}

fn cell_types(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let symbol = RelType::new(ACRONYM)?;
    let seed = Seed::vocabulary_codes(CL, "CellCUI").with_code_id("cl_id");
    let composer = QueryComposer::new(seed)
        .fragment(PropertyFragment::synonym(CL, "CellCUI", "term", false)?.term_type(PREFERRED)?)
        .fragment(PropertyFragment::synonym(CL, "CellCUI", "synonyms", true)?)
        .fragment(PropertyFragment::definition([CL], "CellCUI", "definition", true)?)
        .fragment(
            PropertyFragment::relationship(HRA, "CellCUI", HAS_MARKER_GENE, "biomarkers")?
                .target_sabs([HGNC])
                .record(vec![RecordPart::CodeId, RecordPart::Term, RecordPart::CodeTerm(symbol)])
                .collect(),
        )
        .fragment(
            PropertyFragment::relationship(HRA, "CellCUI", LOCATED_IN, "organs")?
                .target_sabs([UBERON])
                .record(vec![RecordPart::CodeId, RecordPart::Term, RecordPart::RelationshipSab])
                .collect(),
        )
        .returns(["cl_id", "term", "synonyms", "definition", "biomarkers", "organs"])
        .order_by("term");

    let detail = FieldShape::new()
        .field("cl_id", "cl_id", FieldRule::Scalar)
        .field("name", "term", FieldRule::Scalar)
        .field("definition", "definition", FieldRule::Custom(definition_text))
        .field("biomarkers", "biomarkers", FieldRule::Each(biomarker))
        .field("organs", "organs", FieldRule::Each(organ));

    let list = ListShape {
        items_key: "cell_types",
        prefix: vec![Target::scalar("term")],
        shape: FieldShape::new()
            .field("id", "cl_id", FieldRule::Scalar)
            .field("term", "term", FieldRule::Scalar)
            .field("synonyms", "synonyms", FieldRule::StringList)
            .field("definition", "definition", FieldRule::Custom(definition_text)),
    };

    Ok(ResourceDescriptor::new(ResourceFamily::CellTypes, config.context(), composer, "cl_id", detail)
        .filter(
            "id",
            FilterBinding::Identifier { targets: vec![Target::scalar("cl_id")], code_prefix: "CL:" },
        )
        .list(list))
}

// ============================================================================
// Metadata fields
// ============================================================================

/// Field names are not unique across concepts; rows dedup on the concept.
const FIELD_KEY: &str = "FieldCUI";

/// Seed and columns every field family shares: the field name from its
/// HMFIELD code and its code ids in the mapping vocabularies.
fn field_composer() -> Result<QueryComposer> {
    let seed = Seed::vocabulary_codes(HMFIELD, "FieldCUI");
    Ok(QueryComposer::new(seed)
        .fragment(PropertyFragment::synonym(HMFIELD, "FieldCUI", "name", false)?.term_type(PREFERRED)?)
        .fragment(PropertyFragment::cross_reference(FIELD_MAPPING_SABS, "FieldCUI", "code_ids", true)?)
        .order_by("name"))
}

fn field_shape() -> FieldShape {
    FieldShape::new()
        .field("code_ids", "code_ids", FieldRule::CodeIds)
        .field("name", "name", FieldRule::Scalar)
}

fn name_filter() -> FilterBinding {
    FilterBinding::Exact(Target::scalar("name"))
}

/// Field relationship asserted by either mapping vocabulary.
fn field_relationship(label: &str, alias: &str) -> Result<PropertyFragment> {
    Ok(PropertyFragment::relationship(HMFIELD, "FieldCUI", label, alias)?.sabs(FIELD_MAPPING_SABS))
}

fn field_descriptions(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let composer = field_composer()?
        .fragment(PropertyFragment::definition(FIELD_MAPPING_SABS, "FieldCUI", "descriptions", true)?)
        .returns(["code_ids", "name", "descriptions"]);
    let detail = field_shape().field("descriptions", "descriptions", FieldRule::CompoundList(&["source", "description"]));

    Ok(ResourceDescriptor::new(ResourceFamily::FieldDescriptions, config.context(), composer, FIELD_KEY, detail)
        .filter("name", name_filter())
        .filter(
            "source",
            FilterBinding::RecordPrefix { target: Target::list("descriptions"), separator: "|" },
        ))
}

fn field_types(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let types = |alias: &str| -> Result<PropertyFragment> {
        Ok(field_relationship(HAS_DATATYPE, alias)?.target_sabs(FIELD_TYPE_SABS).collect())
    };
    let composer = field_composer()?
        .fragment(
            types("types")?.record(vec![RecordPart::RelationshipSab, RecordPart::CodeSab, RecordPart::Term]),
        )
        // Filter-only columns; dropped from the query unless filtered on.
        .fragment(types("mapping_sources")?.record(vec![RecordPart::RelationshipSab]))
        .fragment(types("type_sources")?.record(vec![RecordPart::CodeSab]))
        .fragment(types("type_names")?)
        .returns(["code_ids", "name", "types"]);
    let detail = field_shape().field("types", "types", FieldRule::TypeMappings);

    Ok(ResourceDescriptor::new(ResourceFamily::FieldTypes, config.context(), composer, FIELD_KEY, detail)
        .filter("name", name_filter())
        .filter("mapping_source", FilterBinding::IgnoreCase(Target::list("mapping_sources")))
        .filter("type_source", FilterBinding::IgnoreCase(Target::list("type_sources")))
        .filter("type", FilterBinding::TypeName(Target::list("type_names"))))
}

fn field_schemas(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let composer = field_composer()?
        .fragment(
            field_relationship(USED_IN_SCHEMA, "schemas")?
                .record(vec![RecordPart::RelationshipSab, RecordPart::Term])
                .collect(),
        )
        .fragment(field_relationship(USED_IN_SCHEMA, "schema_names")?.collect())
        .returns(["code_ids", "name", "schemas"]);
    let detail = field_shape().field("schemas", "schemas", FieldRule::CompoundList(&["source", "schema"]));

    Ok(ResourceDescriptor::new(ResourceFamily::FieldSchemas, config.context(), composer, FIELD_KEY, detail)
        .filter("name", name_filter())
        .filter("source", FilterBinding::RecordPrefix { target: Target::list("schemas"), separator: "|" })
        .filter("schema", FilterBinding::IgnoreCase(Target::list("schema_names"))))
}

fn field_entities(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let composer = field_composer()?
        .fragment(
            field_relationship(USED_IN_ENTITY, "entities")?
                .target_sabs(FIELD_ENTITY_SABS)
                .record(vec![RecordPart::CodeSab, RecordPart::Code, RecordPart::Term])
                .per_concept(),
        )
        .fragment(field_relationship(USED_IN_ENTITY, "entity_names")?.target_sabs(FIELD_ENTITY_SABS).collect())
        .returns(["code_ids", "name", "entities"]);
    let detail = field_shape().field("entities", "entities", FieldRule::NestedRecords(&["source", "code", "name"]));

    Ok(ResourceDescriptor::new(ResourceFamily::FieldEntities, config.context(), composer, FIELD_KEY, detail)
        .filter("name", name_filter())
        .filter("source", FilterBinding::RecordPrefix { target: Target::list("code_ids"), separator: ":" })
        .filter("entity", FilterBinding::IgnoreCase(Target::list("entity_names"))))
}

// ============================================================================
// Value sets and gene relationships
// ============================================================================

/// The single value given for `name`.
fn single<'a>(filters: &'a NamedFilters, name: &str) -> Result<&'a str> {
    let values: Vec<&str> =
        filters.get(name).into_iter().flatten().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
    match values.as_slice() {
        [one] => Ok(*one),
        [] => Err(Error::InvalidRequest(format!("filter '{name}' is required"))),
        _ => Err(Error::InvalidRequest(format!("filter '{name}' takes a single value"))),
    }
}

fn value_set_seed(filters: &NamedFilters) -> Result<Seed> {
    let parent_sab = single(filters, "parent_sab")?;
    let parent_code = single(filters, "parent_code")?;
    let child_sabs: Vec<String> = filters
        .get("child_sabs")
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .collect();
    Ok(Seed::children(parent_sab, parent_code, child_sabs, "ChildCUI", "term").with_code("code").with_code_sab("sab"))
}

/// Children of a parent code, each represented once by its code in the
/// most preferred child vocabulary. No children is an empty set.
fn value_set(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let template = Seed::children("", "", Vec::new(), "ChildCUI", "term").with_code("code").with_code_sab("sab");
    let composer = QueryComposer::new(template).returns(["sab", "code", "term"]);
    let detail = FieldShape::new()
        .field("sab", "sab", FieldRule::Scalar)
        .field("code", "code", FieldRule::Scalar)
        .field("term", "term", FieldRule::Scalar);

    Ok(ResourceDescriptor::new(ResourceFamily::ValueSet, config.context(), composer, "ChildCUI", detail)
        .filter("parent_sab", FilterBinding::Seed)
        .filter("parent_code", FilterBinding::Seed)
        .filter("child_sabs", FilterBinding::Seed)
        .require("parent_sab")
        .require("parent_code")
        .require("child_sabs")
        .seeded_by(value_set_seed)
        .empty_ok())
}

/// Approved, previous and alias symbols of the genes any of whose symbols
/// or names equals the target symbol.
fn gene_relationships(config: &OntologyConfig) -> Result<ResourceDescriptor> {
    let seed = Seed::vocabulary_codes(HGNC, "GeneCUI").with_code_id("hgnc_id");
    let terms = |alias: &str, term_type: &str, collect: bool| -> Result<PropertyFragment> {
        PropertyFragment::synonym(HGNC, "GeneCUI", alias, collect)?.term_type(term_type)
    };
    let composer = QueryComposer::new(seed)
        .fragment(terms("approved_symbols", ACRONYM, true)?)
        .fragment(terms("previous_symbols", PREVIOUS_SYMBOL, true)?)
        .fragment(terms("alias_symbols", ALIAS_SYMBOL, true)?)
        // Filter-only columns.
        .fragment(terms("approved_name", PREFERRED, false)?)
        .fragment(terms("previous_names", PREVIOUS_NAME, true)?)
        .fragment(terms("alias_names", ALIAS_NAME, true)?)
        .returns(["hgnc_id", "approved_symbols", "previous_symbols", "alias_symbols"])
        .order_by("hgnc_id");

    let detail = FieldShape::new()
        .field("symbol-approved", "approved_symbols", FieldRule::StringList)
        .field("symbol-previous", "previous_symbols", FieldRule::StringList)
        .field("symbol-alias", "alias_symbols", FieldRule::StringList);

    let target_symbol = FilterBinding::Identifier {
        targets: vec![
            Target::list("approved_symbols"),
            Target::list("previous_symbols"),
            Target::list("alias_symbols"),
            Target::scalar("approved_name"),
            Target::list("previous_names"),
            Target::list("alias_names"),
        ],
        code_prefix: "",
    };
    Ok(ResourceDescriptor::new(ResourceFamily::Relationships, config.context(), composer, "hgnc_id", detail)
        .filter("target_symbol", target_symbol)
        .require("target_symbol"))
}
