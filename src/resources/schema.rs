//! Vocabularies, codes and relationship labels the resource families read.
//!
//! Root codes that differ per deployment live in
//! [`SchemaConstants`](crate::config::SchemaConstants); the names here are
//! fixed by the ontology build.

// Source vocabularies.
pub const HGNC: &str = "HGNC";
pub const UNIPROTKB: &str = "UNIPROTKB";
pub const CL: &str = "CL";
pub const UBERON: &str = "UBERON";
pub const HMFIELD: &str = "HMFIELD";
pub const CEDAR: &str = "CEDAR";
pub const XSD: &str = "XSD";
pub const HRA: &str = "HRA";
pub const REFSEQ: &str = "REFSEQ";
pub const ENTREZ: &str = "ENTREZ";
pub const ENSEMBL: &str = "ENSEMBL";
pub const OMIM: &str = "OMIM";
pub const HUBMAP: &str = "HUBMAP";
pub const SENNET: &str = "SENNET";

/// Vocabularies a gene is cross-referenced in.
pub const GENE_REFERENCE_SABS: [&str; 5] = [HGNC, ENTREZ, ENSEMBL, OMIM, UNIPROTKB];
/// Vocabularies that map metadata fields.
pub const FIELD_MAPPING_SABS: [&str; 2] = [HMFIELD, CEDAR];
/// Vocabularies that hold field data types.
pub const FIELD_TYPE_SABS: [&str; 2] = [HMFIELD, XSD];
/// Vocabularies that hold entity types a field belongs to.
pub const FIELD_ENTITY_SABS: [&str; 3] = [HMFIELD, HUBMAP, SENNET];

// Dataset classification codes, shared by every application context.
/// `Primary Dataset`, then `Derived Dataset`.
pub const DATASET_ORDER_CODES: [&str; 2] = ["C004003", "C004004"];
pub const VIS_ONLY_CODE: &str = "C004008";
pub const CONTAINS_PII_CODE: &str = "C004009";
/// Parent of dataset types processed outside the context's pipeline.
pub const EXTERNALLY_PROCESSED_CODE: &str = "C004034";

/// Assay type terms carry this suffix in the graph.
pub const ASSAYTYPE_SUFFIX: &str = "_assaytype";

/// Skin's UBERON crosswalk points at a child term; the organ list reports
/// the parent instead.
pub const SKIN_CUI: &str = "C1123023";
pub const SKIN_UBERON: &str = "UBERON 0002097";

// Relationship labels.
pub const HAS_DATA_TYPE: &str = "has_data_type";
pub const HAS_DISPLAY_NAME: &str = "has_display_name";
pub const PROVIDED_BY: &str = "provided_by";
pub const CONTAINS: &str = "contains";
pub const ISA: &str = "isa";
pub const HAS_TWO_CHARACTER_CODE: &str = "has_two_character_code";
pub const HAS_MARKER_GENE: &str = "has_marker_gene";
pub const LOCATED_IN: &str = "located_in";
pub const HAS_DATATYPE: &str = "has_datatype";
pub const USED_IN_SCHEMA: &str = "used_in_schema";
pub const USED_IN_ENTITY: &str = "used_in_entity";
pub const HAS_ASSAYTYPE: &str = "has_assaytype";
pub const HAS_PROCESS_STATE: &str = "has_process_state";
pub const HAS_PIPELINE_SHORTHAND: &str = "has_pipeline_shorthand";
pub const HAS_DESCRIPTION: &str = "has_description";
pub const HAS_ACTIVE_STATUS: &str = "has_active_status";
pub const MUST_CONTAIN: &str = "must_contain";
pub const HAS_DATASET_TYPE: &str = "has_dataset_type";
pub const HAS_PDR_CATEGORY: &str = "has_pdr_category";
pub const HAS_FIG2_AGGREGATED_ASSAYTYPE: &str = "has_fig2_agg_assay_type";
pub const HAS_FIG2_MODALITY: &str = "has_fig2_modality";
pub const HAS_FIG2_CATEGORY: &str = "has_fig2_category";

// Term types on codes.
pub const PREFERRED: &str = "PT";
pub const ACRONYM: &str = "ACR";
pub const PREVIOUS_SYMBOL: &str = "NS";
pub const ALIAS_SYMBOL: &str = "SYN";
pub const PREVIOUS_NAME: &str = "NP";
pub const ALIAS_NAME: &str = "SYNN";

/// Provider value for datasets processed by the context's own pipeline.
pub fn iec_provider(context: &str) -> String {
    format!("{context} IEC")
}

pub const EXTERNAL_PROVIDER: &str = "External Provider";

/// Curation and organism reported for every UniProtKB entry in the graph.
pub const UNIPROT_CURATION: &str = "swissprot";
pub const UNIPROT_ORGANISM: &str = "Homo sapiens";

/// Source label of cell type biomarkers.
pub const BIOMARKER_REFERENCE: &str = "Human Reference Atlas";
