//! Subquery fragments for the Concept/Code/Term graph model.
//!
//! In the ontology graph an entity's "properties" are not node attributes but
//! multi-hop paths:
//!
//! ```text
//! relationship:  (Concept)-[rel {SAB}]->(Concept)-[:PREF_TERM]->(Term)
//!                (Concept)-[rel {SAB}]->(Concept)-[:CODE]->(Code)-[:PT]->(Term)
//! synonym:       (Concept)-[:CODE]->(Code {SAB})-[:SY]->(Term)
//! hierarchy:     (Concept)-[:isa {SAB}]->(Concept)-[:CODE]->(Code {CODE in list})
//! definition:    (Concept)-[:DEF]->(Definition {SAB})
//! ```
//!
//! Each fragment renders to one `CALL { WITH <var> OPTIONAL MATCH ... }`
//! sub-scope that consumes exactly one correlation variable and produces
//! exactly one output alias. Every sub-scope aggregates, so it yields exactly
//! one row per incoming row: zero matches give null, `false` or `[]`, never
//! an error and never a dropped row, and several matches never multiply
//! rows. Without `collect` the first match is kept.

use smallvec::SmallVec;

use crate::model::relationship::check_identifier;
use crate::model::{Direction, PropertyMap, RelType, Value};
use crate::{Error, Result};

/// Relationship whose collected terms carry an authoring artifact suffix.
pub const VITESSCE_HINT_LABEL: &str = "has_vitessce_hint";
/// Suffix stripped from collected `has_vitessce_hint` terms.
pub const VITESSCE_HINT_SUFFIX: &str = "_vitessce_hint";

type Sabs = SmallVec<[String; 2]>;

/// What kind of property a fragment computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    /// Term (or encoded record) of a related entity.
    Relationship,
    /// Term of the entity's own codes (`SY` by default).
    Synonym,
    /// Relationship through `isa` to an allow-list of codes.
    Hierarchy,
    /// Existence of a relationship to an allow-list of codes.
    Boolean,
    /// `DEF` text of the entity, encoded `SAB|text`.
    Definition,
    /// Code ids of the same concept in other vocabularies.
    CrossReference,
    /// Concept id of a related entity, used to correlate later fragments.
    RelatedConcept,
}

/// One component of a pipe-encoded record projected from a related code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordPart {
    CodeId,
    Code,
    CodeSab,
    RelationshipSab,
    Term,
    /// Term of the given term type hanging off the related code (e.g. `ACR`).
    CodeTerm(RelType),
    /// Definition of the related concept from the code's own vocabulary.
    Definition,
    /// `CodeID*term` of every concept the related concept reaches through
    /// `label` (asserted by `sab`) with a code in `code_sab`, joined with `;`.
    RelatedCodes { label: RelType, sab: String, code_sab: String },
}

impl RecordPart {
    /// Vocabularies are spliced into the text, so they are checked like
    /// labels.
    pub fn related_codes(label: &str, sab: &str, code_sab: &str) -> Result<Self> {
        check_identifier("vocabulary", sab)?;
        check_identifier("vocabulary", code_sab)?;
        Ok(RecordPart::RelatedCodes {
            label: RelType::new(label)?,
            sab: sab.to_owned(),
            code_sab: code_sab.to_owned(),
        })
    }

    fn expr(&self) -> String {
        match self {
            RecordPart::CodeId => "cProperty.CodeID".into(),
            RecordPart::Code => "cProperty.CODE".into(),
            RecordPart::CodeSab => "cProperty.SAB".into(),
            RecordPart::RelationshipSab => "rProperty.SAB".into(),
            RecordPart::Term => "tProperty.name".into(),
            RecordPart::CodeTerm(tt) => {
                format!("coalesce(head([(cProperty)-[:{tt}]->(tAux:Term) | tAux.name]), '')")
            }
            RecordPart::Definition => "coalesce(head([(pProperty)-[:DEF]->(dAux:Definition) \
                 WHERE dAux.SAB = cProperty.SAB | dAux.DEF]), '')"
                .into(),
            RecordPart::RelatedCodes { label, sab, code_sab } => format!(
                "reduce(s = '', x IN [(pProperty)-[rAux:{label}]->(pAux:Concept)-[:CODE]->(cAux:Code)\
                 -[rAuxTerm:PT]->(tAux:Term) WHERE rAux.SAB = '{sab}' AND cAux.SAB = '{code_sab}' \
                 AND rAuxTerm.CUI = pAux.CUI | cAux.CodeID + '*' + tAux.name] \
                 | s + CASE s WHEN '' THEN '' ELSE ';' END + x)"
            ),
        }
    }
}

/// How a relationship fragment turns the matched path into its output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Projection {
    /// The related entity's preferred term.
    #[default]
    Term,
    /// The related concept's CUI.
    ConceptId,
    /// A `|`-joined record of parts. With `per_concept`, all codes of one
    /// related concept are joined with `;` into a single element.
    Record { parts: Vec<RecordPart>, per_concept: bool },
}

impl Projection {
    fn needs_code(&self) -> bool {
        matches!(self, Projection::Record { .. })
    }
}

/// A single property subquery. Immutable once built; consumed by the
/// composer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyFragment {
    kind: FragmentKind,
    input: String,
    alias: String,
    sabs: Sabs,
    target_sabs: Sabs,
    label: Option<RelType>,
    term_type: Option<RelType>,
    direction: Direction,
    projection: Projection,
    collect: bool,
    codes: SmallVec<[String; 2]>,
    overrides: Vec<(String, String)>,
    strip: Option<String>,
}

fn sabs_of<I, S>(sabs: I) -> Sabs
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    sabs.into_iter().map(Into::into).collect()
}

impl PropertyFragment {
    fn base(kind: FragmentKind, sabs: Sabs, input: &str, alias: &str) -> Result<Self> {
        check_identifier("correlation variable", input)?;
        check_identifier("return alias", alias)?;
        Ok(Self {
            kind,
            input: input.to_owned(),
            alias: alias.to_owned(),
            sabs,
            target_sabs: Sabs::new(),
            label: None,
            term_type: None,
            direction: Direction::Outgoing,
            projection: Projection::Term,
            collect: false,
            codes: SmallVec::new(),
            overrides: Vec::new(),
            strip: None,
        })
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// Preferred term of the entity related to `input` through `label`,
    /// where the relationship is asserted by `sab`.
    pub fn relationship(sab: &str, input: &str, label: &str, alias: &str) -> Result<Self> {
        let mut f = Self::base(FragmentKind::Relationship, sabs_of([sab]), input, alias)?;
        f.label = Some(RelType::new(label)?);
        if label == VITESSCE_HINT_LABEL {
            f.strip = Some(VITESSCE_HINT_SUFFIX.to_owned());
        }
        Ok(f)
    }

    /// `SY` terms of the entity's own codes in `sab`. Without `collect` the
    /// first term (or null) is returned, so the row count never changes.
    pub fn synonym(sab: &str, input: &str, alias: &str, collect: bool) -> Result<Self> {
        let mut f = Self::base(FragmentKind::Synonym, sabs_of([sab]), input, alias)?;
        f.term_type = Some(RelType::new("SY")?);
        f.collect = collect;
        Ok(f)
    }

    /// `isa` parent among `codes`. With exactly two codes the output is
    /// `true` for the first, `false` for the second and `''` otherwise.
    pub fn hierarchy<I, S>(sab: &str, input: &str, alias: &str, codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut f = Self::base(FragmentKind::Hierarchy, sabs_of([sab]), input, alias)?;
        f.label = Some(RelType::new("isa")?);
        f.codes = codes.into_iter().map(Into::into).collect();
        Ok(f)
    }

    /// `true` when a `label` path to one of `codes` exists.
    pub fn boolean<I, S>(sab: &str, input: &str, label: &str, alias: &str, codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut f = Self::base(FragmentKind::Boolean, sabs_of([sab]), input, alias)?;
        f.label = Some(RelType::new(label)?);
        f.codes = codes.into_iter().map(Into::into).collect();
        Ok(f)
    }

    /// Definitions of the entity from any of `sabs`, encoded `SAB|text`.
    pub fn definition<I, S>(sabs: I, input: &str, alias: &str, collect: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut f = Self::base(FragmentKind::Definition, sabs_of(sabs), input, alias)?;
        f.collect = collect;
        Ok(f)
    }

    /// Code ids of the entity's concept in any of `sabs`.
    pub fn cross_reference<I, S>(sabs: I, input: &str, alias: &str, collect: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut f = Self::base(FragmentKind::CrossReference, sabs_of(sabs), input, alias)?;
        f.collect = collect;
        Ok(f)
    }

    /// CUI of the concept related to `input` through `label`.
    pub fn related_concept(sab: &str, input: &str, label: &str, alias: &str) -> Result<Self> {
        let mut f = Self::base(FragmentKind::RelatedConcept, sabs_of([sab]), input, alias)?;
        f.label = Some(RelType::new(label)?);
        f.projection = Projection::ConceptId;
        Ok(f)
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    pub fn collect(mut self) -> Self {
        self.collect = true;
        self
    }

    /// Follow the relationship from the related entity to this one.
    pub fn incoming(mut self) -> Self {
        self.direction = Direction::Incoming;
        self
    }

    /// Accept relationships asserted by any of `sabs`.
    pub fn sabs<I, S>(mut self, sabs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sabs = sabs_of(sabs);
        self
    }

    /// Join through a code of the related concept in one of `sabs`.
    pub fn target_sabs<I, S>(mut self, sabs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_sabs = sabs_of(sabs);
        self
    }

    /// Restrict the related code to an allow-list.
    pub fn codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Term type followed by a synonym fragment (`ACR`, `PT`, `NS`, ...).
    pub fn term_type(mut self, term_type: &str) -> Result<Self> {
        self.term_type = Some(RelType::new(term_type)?);
        Ok(self)
    }

    /// Project a pipe-encoded record instead of the bare term.
    pub fn record(mut self, parts: Vec<RecordPart>) -> Self {
        self.projection = Projection::Record { parts, per_concept: false };
        self
    }

    /// Join all records of one related concept with `;`.
    pub fn per_concept(mut self) -> Self {
        if let Projection::Record { per_concept, .. } = &mut self.projection {
            *per_concept = true;
        }
        self
    }

    /// Remove `suffix` from related terms (`AF_assaytype` gives `AF`).
    pub fn strip_suffix(mut self, suffix: &str) -> Result<Self> {
        check_identifier("term suffix", suffix)?;
        self.strip = Some(suffix.to_owned());
        Ok(self)
    }

    /// Replace the cross-referenced code id for one concept.
    pub fn override_code(mut self, cui: &str, code_id: &str) -> Self {
        self.overrides.push((cui.to_owned(), code_id.to_owned()));
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn kind(&self) -> FragmentKind { self.kind }
    pub fn input(&self) -> &str { &self.input }
    pub fn alias(&self) -> &str { &self.alias }
    pub fn label(&self) -> Option<&RelType> { self.label.as_ref() }
    pub fn is_collected(&self) -> bool { self.collect }
    pub fn code_filter(&self) -> &[String] { &self.codes }

    /// True when the fragment yields a list of strings.
    pub fn yields_list(&self) -> bool {
        self.collect
            || matches!(&self.projection, Projection::Record { per_concept: true, .. })
    }

    fn param(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.alias)
    }

    fn joins_code(&self) -> bool {
        !self.codes.is_empty()
            || !self.target_sabs.is_empty()
            || self.projection.needs_code()
            || self.kind == FragmentKind::Boolean
    }

    /// Render the sub-scope text and the parameters it binds.
    pub fn render(&self) -> Result<(String, PropertyMap)> {
        if self.sabs.is_empty() {
            return Err(Error::Configuration(format!(
                "fragment '{}' has no source vocabulary", self.alias
            )));
        }
        match self.kind {
            FragmentKind::Relationship
            | FragmentKind::Hierarchy
            | FragmentKind::Boolean
            | FragmentKind::RelatedConcept => self.render_relationship(),
            FragmentKind::Synonym => self.render_synonym(),
            FragmentKind::Definition => self.render_definition(),
            FragmentKind::CrossReference => self.render_cross_reference(),
        }
    }

    fn render_relationship(&self) -> Result<(String, PropertyMap)> {
        let label = self.label.as_ref().ok_or_else(|| {
            Error::Configuration(format!("fragment '{}' has no relationship label", self.alias))
        })?;
        if matches!(self.kind, FragmentKind::Boolean | FragmentKind::Hierarchy) && self.codes.is_empty() {
            return Err(Error::Configuration(format!(
                "fragment '{}' needs a code allow-list", self.alias
            )));
        }

        let mut params = PropertyMap::new();
        let sab_param = self.param("sab");
        params.insert(sab_param.clone(), Value::from(self.sabs.to_vec()));

        let path = self.direction.pattern(
            "(pEntity:Concept)",
            &format!("rProperty:{label}"),
            "(pProperty:Concept)",
        );
        let mut text = format!("CALL {{ WITH {input} OPTIONAL MATCH {path}", input = self.input);
        let mut conds = vec![
            format!("pEntity.CUI = {}", self.input),
            format!("rProperty.SAB IN ${sab_param}"),
        ];

        if self.joins_code() {
            text.push_str("-[:CODE]->(cProperty:Code)-[rCodeTerm:PT]->(tProperty:Term)");
            let tsab_param = self.param("tsab");
            let targets = if self.target_sabs.is_empty() { &self.sabs } else { &self.target_sabs };
            params.insert(tsab_param.clone(), Value::from(targets.to_vec()));
            conds.push(format!("cProperty.SAB IN ${tsab_param}"));
            conds.push("rCodeTerm.CUI = pProperty.CUI".into());
            if !self.codes.is_empty() {
                let codes_param = self.param("codes");
                params.insert(codes_param.clone(), Value::from(self.codes.to_vec()));
                conds.push(format!("cProperty.CODE IN ${codes_param}"));
            }
        } else if self.projection != Projection::ConceptId {
            text.push_str("-[:PREF_TERM]->(tProperty:Term)");
        }

        text.push_str(" WHERE ");
        text.push_str(&conds.join(" AND "));
        text.push(' ');
        text.push_str(&self.relationship_return()?);
        text.push_str(" }");
        Ok((text, params))
    }

    fn relationship_return(&self) -> Result<String> {
        let alias = &self.alias;
        if let Projection::Record { parts, per_concept } = &self.projection {
            if parts.is_empty() {
                return Err(Error::Configuration(format!("fragment '{alias}' has an empty record")));
            }
            let record = parts.iter().map(RecordPart::expr).collect::<Vec<_>>().join(" + '|' + ");
            return Ok(if *per_concept {
                format!(
                    "WITH pProperty, COLLECT(DISTINCT {record}) AS records WHERE pProperty IS NOT NULL \
                     RETURN COLLECT(reduce(s = '', r IN records | s + CASE s WHEN '' THEN '' ELSE ';' END + r)) AS {alias}"
                )
            } else if self.collect {
                format!("RETURN COLLECT(DISTINCT {record}) AS {alias}")
            } else {
                format!("RETURN head(COLLECT({record})) AS {alias}")
            });
        }

        let expr = if self.projection == Projection::ConceptId {
            if self.collect { "COLLECT(DISTINCT pProperty.CUI)".to_owned() } else { "head(COLLECT(pProperty.CUI))".to_owned() }
        } else if self.collect {
            format!("COLLECT({})", self.term_expr())
        } else if self.kind == FragmentKind::Boolean {
            "count(cProperty) > 0".to_owned()
        } else if self.codes.len() == 2 {
            let codes = self.param("codes");
            format!(
                "coalesce(head(COLLECT(CASE cProperty.CODE WHEN ${codes}[0] THEN true WHEN ${codes}[1] THEN false ELSE '' END)), '')"
            )
        } else {
            format!("coalesce(head(COLLECT({})), '')", self.term_expr())
        };
        Ok(format!("RETURN {expr} AS {alias}"))
    }

    fn term_expr(&self) -> String {
        match &self.strip {
            Some(suffix) => format!("REPLACE(tProperty.name, '{suffix}', '')"),
            None => "tProperty.name".to_owned(),
        }
    }

    fn render_synonym(&self) -> Result<(String, PropertyMap)> {
        let tt = self.term_type.as_ref().ok_or_else(|| {
            Error::Configuration(format!("fragment '{}' has no term type", self.alias))
        })?;
        let sab_param = self.param("sab");
        let mut params = PropertyMap::new();
        params.insert(sab_param.clone(), Value::from(self.sabs.to_vec()));
        let ret = if self.collect { "COLLECT(DISTINCT tSyn.name)" } else { "head(COLLECT(DISTINCT tSyn.name))" };
        let text = format!(
            "CALL {{ WITH {input} OPTIONAL MATCH (pEntity:Concept)-[:CODE]->(cEntity:Code)-[rCodeTerm:{tt}]->(tSyn:Term) \
             WHERE pEntity.CUI = {input} AND cEntity.SAB IN ${sab_param} AND rCodeTerm.CUI = pEntity.CUI \
             RETURN {ret} AS {alias} }}",
            input = self.input,
            alias = self.alias,
        );
        Ok((text, params))
    }

    fn render_definition(&self) -> Result<(String, PropertyMap)> {
        let sab_param = self.param("sab");
        let mut params = PropertyMap::new();
        params.insert(sab_param.clone(), Value::from(self.sabs.to_vec()));
        let record = "d.SAB + '|' + d.DEF";
        let ret = if self.collect { format!("COLLECT(DISTINCT {record})") } else { format!("head(COLLECT(DISTINCT {record}))") };
        let text = format!(
            "CALL {{ WITH {input} OPTIONAL MATCH (pEntity:Concept)-[:DEF]->(d:Definition) \
             WHERE pEntity.CUI = {input} AND d.SAB IN ${sab_param} \
             RETURN {ret} AS {alias} }}",
            input = self.input,
            alias = self.alias,
        );
        Ok((text, params))
    }

    fn render_cross_reference(&self) -> Result<(String, PropertyMap)> {
        let sab_param = self.param("sab");
        let mut params = PropertyMap::new();
        params.insert(sab_param.clone(), Value::from(self.sabs.to_vec()));

        let mut expr = String::from("cRef.CodeID");
        if !self.overrides.is_empty() {
            let mut case = String::from("CASE pEntity.CUI");
            for (i, (cui, code_id)) in self.overrides.iter().enumerate() {
                let cui_param = self.param(&format!("override_cui_{i}"));
                let code_param = self.param(&format!("override_code_{i}"));
                case.push_str(&format!(" WHEN ${cui_param} THEN ${code_param}"));
                params.insert(cui_param, Value::from(cui.as_str()));
                params.insert(code_param, Value::from(code_id.as_str()));
            }
            case.push_str(" ELSE cRef.CodeID END");
            expr = case;
        }
        let ret = if self.collect {
            format!("RETURN COLLECT(DISTINCT {expr}) AS {}", self.alias)
        } else {
            format!("RETURN head(COLLECT(DISTINCT {expr})) AS {}", self.alias)
        };
        let text = format!(
            "CALL {{ WITH {input} OPTIONAL MATCH (pEntity:Concept)-[:CODE]->(cRef:Code) \
             WHERE pEntity.CUI = {input} AND cRef.SAB IN ${sab_param} {ret} }}",
            input = self.input,
        );
        Ok((text, params))
    }
}

// ============================================================================
// Seeds
// ============================================================================

/// Where a seed finds its entities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SeedSource {
    /// Every `isa` descendant of a root code, never the root itself.
    RootSubset { root_sab: String, root_code: String },
    /// Every code of the seed vocabulary.
    VocabularyCodes,
    /// Direct `isa` children of one parent code. Each child is represented
    /// by its code in the earliest of `child_sabs` that has one.
    Children { parent_code: String, child_sabs: Vec<String> },
}

/// The first subquery of a composition: introduces the correlation variable
/// and a few cheap per-entity columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Seed {
    source: SeedSource,
    sab: String,
    correlation: String,
    display: Option<String>,
    code_id: Option<String>,
    code: Option<String>,
    code_sab: Option<String>,
    code_term: bool,
    any_isa_source: bool,
}

impl Seed {
    /// Descendants of `root_code` through `isa` edges asserted by `sab`
    /// (any vocabulary after [`Seed::any_isa_source`]), with their preferred
    /// term as `display`.
    pub fn root_subset(sab: &str, root_code: &str, correlation: &str, display: &str) -> Self {
        Self {
            source: SeedSource::RootSubset {
                root_sab: sab.to_owned(),
                root_code: root_code.to_owned(),
            },
            sab: sab.to_owned(),
            correlation: correlation.to_owned(),
            display: Some(display.to_owned()),
            code_id: None,
            code: None,
            code_sab: None,
            code_term: false,
            any_isa_source: false,
        }
    }

    /// Every concept with a code in `sab`.
    pub fn vocabulary_codes(sab: &str, correlation: &str) -> Self {
        Self {
            source: SeedSource::VocabularyCodes,
            sab: sab.to_owned(),
            correlation: correlation.to_owned(),
            display: None,
            code_id: None,
            code: None,
            code_sab: None,
            code_term: false,
            any_isa_source: false,
        }
    }

    /// Children of `parent_sab:parent_code` with codes in `child_sabs`,
    /// preferred in list order. The chosen code's term is `display`.
    pub fn children(
        parent_sab: &str,
        parent_code: &str,
        child_sabs: Vec<String>,
        correlation: &str,
        display: &str,
    ) -> Self {
        Self {
            source: SeedSource::Children { parent_code: parent_code.to_owned(), child_sabs },
            sab: parent_sab.to_owned(),
            correlation: correlation.to_owned(),
            display: Some(display.to_owned()),
            code_id: None,
            code: None,
            code_sab: None,
            code_term: false,
            any_isa_source: false,
        }
    }

    /// The root code lives in another vocabulary than the descendants.
    pub fn rooted_in(mut self, root_vocabulary: &str) -> Self {
        if let SeedSource::RootSubset { root_sab, .. } = &mut self.source {
            *root_sab = root_vocabulary.to_owned();
        }
        self
    }

    /// Follow `isa` edges whatever vocabulary asserts them.
    pub fn any_isa_source(mut self) -> Self {
        self.any_isa_source = true;
        self
    }

    /// Take `display` from the PT term of the entity's code in the seed
    /// vocabulary instead of the concept's preferred term.
    pub fn term_from_code(mut self) -> Self {
        self.code_term = true;
        self
    }

    /// Return the entity's preferred term under `alias`.
    pub fn with_display(mut self, alias: &str) -> Self {
        self.display = Some(alias.to_owned());
        self
    }

    /// Return the entity's code id (`SAB:CODE`) in the seed vocabulary.
    pub fn with_code_id(mut self, alias: &str) -> Self {
        self.code_id = Some(alias.to_owned());
        self
    }

    /// Return the entity's bare code in the seed vocabulary.
    pub fn with_code(mut self, alias: &str) -> Self {
        self.code = Some(alias.to_owned());
        self
    }

    /// Return the vocabulary of the entity's code.
    pub fn with_code_sab(mut self, alias: &str) -> Self {
        self.code_sab = Some(alias.to_owned());
        self
    }

    pub fn source(&self) -> &SeedSource {
        &self.source
    }

    pub fn correlation(&self) -> &str {
        &self.correlation
    }

    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    /// Every variable the seed binds, correlation variable first.
    pub fn outputs(&self) -> Vec<&str> {
        let mut out = vec![self.correlation.as_str()];
        out.extend(
            [&self.display, &self.code_id, &self.code, &self.code_sab]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
        out
    }

    fn joins_code(&self) -> bool {
        self.source == SeedSource::VocabularyCodes
            || (self.code_term && self.display.is_some())
            || self.code_id.is_some()
            || self.code.is_some()
            || self.code_sab.is_some()
    }

    pub fn render(&self) -> Result<(String, PropertyMap)> {
        for name in self.outputs() {
            check_identifier("seed output", name)?;
        }
        if self.sab.trim().is_empty() {
            return Err(Error::Configuration("seed needs a vocabulary".into()));
        }

        let mut params = PropertyMap::new();
        params.insert("seed_sab".into(), Value::from(self.sab.as_str()));
        if let SeedSource::Children { parent_code, child_sabs } = &self.source {
            return self.render_children(parent_code, child_sabs, params);
        }
        let mut patterns = Vec::new();
        let mut conds = Vec::new();

        if let SeedSource::RootSubset { root_sab, root_code } = &self.source {
            if root_sab.trim().is_empty() || root_code.trim().is_empty() {
                return Err(Error::Configuration(
                    "root subset needs both a vocabulary and a root code".into(),
                ));
            }
            // Both legacy `SAB CODE` and current `SAB:CODE` code ids.
            let ids = vec![format!("{root_sab} {root_code}"), format!("{root_sab}:{root_code}")];
            params.insert("seed_root_ids".into(), Value::from(ids));
            patterns.push("(cRoot:Code)<-[:CODE]-(pRoot:Concept)<-[rIsa:isa]-(pEntity:Concept)".to_owned());
            conds.push("cRoot.CodeID IN $seed_root_ids".to_owned());
            if !self.any_isa_source {
                conds.push("rIsa.SAB = $seed_sab".to_owned());
            }
            conds.push("pEntity.CUI <> pRoot.CUI".to_owned());
        }
        if self.joins_code() {
            patterns.push("(pEntity:Concept)-[:CODE]->(cEntity:Code)".to_owned());
            conds.push("cEntity.SAB = $seed_sab".to_owned());
        }
        if self.display.is_some() && self.code_term {
            patterns.push("(cEntity)-[rTerm:PT]->(tEntity:Term)".to_owned());
            conds.push("rTerm.CUI = pEntity.CUI".to_owned());
        } else if self.display.is_some() {
            patterns.push("(pEntity)-[:PREF_TERM]->(tEntity:Term)".to_owned());
        }

        let mut returns = vec![format!("pEntity.CUI AS {}", self.correlation)];
        if let Some(a) = &self.display {
            returns.push(format!("tEntity.name AS {a}"));
        }
        if let Some(a) = &self.code_id {
            returns.push(format!("cEntity.CodeID AS {a}"));
        }
        if let Some(a) = &self.code {
            returns.push(format!("cEntity.CODE AS {a}"));
        }
        if let Some(a) = &self.code_sab {
            returns.push(format!("cEntity.SAB AS {a}"));
        }

        let text = format!(
            "CALL {{ MATCH {} WHERE {} RETURN DISTINCT {} }}",
            patterns.join(", "),
            conds.join(" AND "),
            returns.join(", "),
        );
        Ok((text, params))
    }

    /// Ranks each child's codes by vocabulary preference, then by code, and
    /// keeps the first. Children without a preferred term on that code drop.
    fn render_children(
        &self,
        parent_code: &str,
        child_sabs: &[String],
        mut params: PropertyMap,
    ) -> Result<(String, PropertyMap)> {
        if parent_code.trim().is_empty() || child_sabs.is_empty() {
            return Err(Error::Configuration("children seed needs a parent code and child vocabularies".into()));
        }
        params.insert("seed_parent_code".into(), Value::from(parent_code));
        params.insert("seed_child_sabs".into(), Value::from(child_sabs.to_vec()));

        let mut returns = vec![format!("pEntity.CUI AS {}", self.correlation)];
        if let Some(a) = &self.display {
            returns.push(format!("head(COLLECT(tEntity.name)) AS {a}"));
        }
        if let Some(a) = &self.code_id {
            returns.push(format!("cEntity.CodeID AS {a}"));
        }
        if let Some(a) = &self.code {
            returns.push(format!("cEntity.CODE AS {a}"));
        }
        if let Some(a) = &self.code_sab {
            returns.push(format!("cEntity.SAB AS {a}"));
        }

        let text = format!(
            "CALL {{ MATCH (cParent:Code)<-[:CODE]-(pParent:Concept)<-[rIsa:isa]-(pEntity:Concept)-[:CODE]->(cChild:Code) \
             WHERE cParent.SAB = $seed_sab AND cParent.CODE = $seed_parent_code \
             AND cChild.SAB IN $seed_child_sabs AND rIsa.SAB IN $seed_child_sabs \
             WITH pEntity, cChild ORDER BY [i IN range(0, size($seed_child_sabs) - 1) \
             WHERE $seed_child_sabs[i] = cChild.SAB][0], cChild.CODE \
             WITH pEntity, head(COLLECT(cChild)) AS cEntity \
             MATCH (cEntity)-[rTerm:PT]->(tEntity:Term) WHERE rTerm.CUI = pEntity.CUI \
             RETURN {} }}",
            returns.join(", "),
        );
        Ok((text, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relationship_term_defaults_to_blank() {
        let f = PropertyFragment::relationship("HUBMAP", "DatasetCUI", "has_display_name", "description").unwrap();
        let (text, params) = f.render().unwrap();
        assert!(text.starts_with("CALL { WITH DatasetCUI OPTIONAL MATCH (pEntity:Concept)-[rProperty:has_display_name]->(pProperty:Concept)-[:PREF_TERM]->(tProperty:Term)"));
        assert!(text.contains("RETURN coalesce(head(COLLECT(tProperty.name)), '') AS description }"));
        assert_eq!(params.get("description_sab"), Some(&Value::from(vec!["HUBMAP"])));
    }

    #[test]
    fn test_vitessce_hints_strip_suffix() {
        let f = PropertyFragment::relationship("HUBMAP", "data_typeCUI", VITESSCE_HINT_LABEL, "vitessce_hints")
            .unwrap()
            .collect();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("COLLECT(REPLACE(tProperty.name, '_vitessce_hint', '')) AS vitessce_hints"));
        assert!(f.yields_list());
    }

    #[test]
    fn test_other_collected_terms_are_not_rewritten() {
        let f = PropertyFragment::relationship("HUBMAP", "x", "has_alt", "alts").unwrap().collect();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("RETURN COLLECT(tProperty.name) AS alts"));
        assert!(!text.contains("REPLACE"));
    }

    #[test]
    fn test_two_code_hierarchy_maps_to_boolean() {
        let f = PropertyFragment::hierarchy("HUBMAP", "DatasetCUI", "primary", ["C004003", "C004004"]).unwrap();
        let (text, params) = f.render().unwrap();
        assert!(text.contains("CASE cProperty.CODE WHEN $primary_codes[0] THEN true WHEN $primary_codes[1] THEN false ELSE '' END)), '') AS primary"));
        assert!(text.contains("cProperty.CODE IN $primary_codes"));
        assert_eq!(params.get("primary_codes"), Some(&Value::from(vec!["C004003", "C004004"])));
        assert_eq!(f.kind(), FragmentKind::Hierarchy);
    }

    #[test]
    fn test_boolean_checks_existence() {
        let f = PropertyFragment::boolean("HUBMAP", "DatasetCUI", "isa", "vis_only", ["C004008"]).unwrap();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("RETURN count(cProperty) > 0 AS vis_only"));
    }

    #[test]
    fn test_boolean_without_codes_is_a_configuration_error() {
        let f = PropertyFragment::boolean("HUBMAP", "x", "isa", "flag", Vec::<String>::new()).unwrap();
        assert!(matches!(f.render(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_related_concept_incoming() {
        let f = PropertyFragment::related_concept("HUBMAP", "data_typeCUI", "has_data_type", "DatasetCUI")
            .unwrap()
            .incoming();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("(pEntity:Concept)<-[rProperty:has_data_type]-(pProperty:Concept) WHERE"));
        assert!(text.contains("RETURN head(COLLECT(pProperty.CUI)) AS DatasetCUI"));
    }

    #[test]
    fn test_synonym_term_type() {
        let f = PropertyFragment::synonym("HGNC", "GeneCUI", "approved_symbol", false)
            .unwrap()
            .term_type("ACR")
            .unwrap();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("-[rCodeTerm:ACR]->(tSyn:Term)"));
        assert!(text.contains("RETURN head(COLLECT(DISTINCT tSyn.name)) AS approved_symbol"));
    }

    #[test]
    fn test_record_per_concept() {
        let f = PropertyFragment::relationship("HMFIELD", "FieldCUI", "used_in_entity", "entities")
            .unwrap()
            .target_sabs(["HMFIELD", "HUBMAP"])
            .record(vec![RecordPart::CodeSab, RecordPart::Code, RecordPart::Term])
            .per_concept();
        let (text, params) = f.render().unwrap();
        assert!(text.contains("cProperty.SAB + '|' + cProperty.CODE + '|' + tProperty.name"));
        assert!(text.contains("reduce(s = ''"));
        assert!(f.yields_list());
        assert_eq!(params.get("entities_tsab"), Some(&Value::from(vec!["HMFIELD", "HUBMAP"])));
    }

    #[test]
    fn test_cross_reference_override() {
        let f = PropertyFragment::cross_reference(["UBERON"], "OrganCUI", "organ_uberon", false)
            .unwrap()
            .override_code("C1123023", "UBERON 0002097");
        let (text, params) = f.render().unwrap();
        assert!(text.contains("CASE pEntity.CUI WHEN $organ_uberon_override_cui_0 THEN $organ_uberon_override_code_0 ELSE cRef.CodeID END"));
        assert_eq!(params.get("organ_uberon_override_code_0"), Some(&Value::from("UBERON 0002097")));
    }

    #[test]
    fn test_single_valued_fragments_aggregate() {
        let fragments = [
            PropertyFragment::relationship("HUBMAP", "x", "provided_by", "provider").unwrap(),
            PropertyFragment::relationship("HRA", "x", "located_in", "organ")
                .unwrap()
                .record(vec![RecordPart::CodeId, RecordPart::Term]),
            PropertyFragment::definition(["CL"], "x", "definition", false).unwrap(),
            PropertyFragment::cross_reference(["UBERON"], "x", "uberon", false).unwrap(),
            PropertyFragment::related_concept("HUBMAP", "x", "has_data_type", "y").unwrap(),
        ];
        for f in fragments {
            let (text, _) = f.render().unwrap();
            let ret = &text[text.rfind("RETURN").unwrap()..];
            assert!(ret.contains("head(COLLECT("), "{}: {ret}", f.alias());
            assert!(!f.yields_list());
        }
    }

    #[test]
    fn test_related_codes_part() {
        let f = PropertyFragment::relationship("HRA", "GeneCUI", "has_marker_gene", "cell_types")
            .unwrap()
            .incoming()
            .target_sabs(["CL"])
            .record(vec![
                RecordPart::CodeId,
                RecordPart::related_codes("located_in", "HRA", "UBERON").unwrap(),
            ])
            .collect();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("[(pProperty)-[rAux:located_in]->(pAux:Concept)-[:CODE]->(cAux:Code)-[rAuxTerm:PT]->(tAux:Term)"));
        assert!(text.contains("WHERE rAux.SAB = 'HRA' AND cAux.SAB = 'UBERON'"));
        assert!(text.contains("cAux.CodeID + '*' + tAux.name"));
        assert!(RecordPart::related_codes("located_in", "HRA' OR 1=1", "UBERON").is_err());
    }

    #[test]
    fn test_invalid_alias_rejected() {
        assert!(PropertyFragment::relationship("HUBMAP", "x", "isa", "alt-names").is_err());
        assert!(PropertyFragment::relationship("HUBMAP", "x", "is a", "ok").is_err());
    }

    #[test]
    fn test_root_subset_excludes_root() {
        let seed = Seed::root_subset("HUBMAP", "C004001", "data_typeCUI", "data_type");
        let (text, params) = seed.render().unwrap();
        assert!(text.contains("pEntity.CUI <> pRoot.CUI"));
        assert!(text.contains("RETURN DISTINCT pEntity.CUI AS data_typeCUI, tEntity.name AS data_type }"));
        assert_eq!(
            params.get("seed_root_ids"),
            Some(&Value::from(vec!["HUBMAP C004001", "HUBMAP:C004001"]))
        );
    }

    #[test]
    fn test_root_in_other_vocabulary() {
        let seed = Seed::root_subset("HUBMAP", "C000008", "OrganCUI", "term")
            .rooted_in("SENNET")
            .with_code("code");
        let (text, params) = seed.render().unwrap();
        assert_eq!(params.get("seed_sab"), Some(&Value::from("HUBMAP")));
        assert_eq!(
            params.get("seed_root_ids"),
            Some(&Value::from(vec!["SENNET C000008", "SENNET:C000008"]))
        );
        assert!(text.contains("cEntity.SAB = $seed_sab"));
        assert_eq!(seed.outputs(), vec!["OrganCUI", "term", "code"]);
    }

    #[test]
    fn test_root_subset_isa_source() {
        let scoped = Seed::root_subset("HUBMAP", "C004001", "data_typeCUI", "data_type");
        assert!(scoped.render().unwrap().0.contains("rIsa.SAB = $seed_sab"));

        let any = scoped.any_isa_source();
        let (text, _) = any.render().unwrap();
        assert!(!text.contains("rIsa.SAB"));
        assert!(text.contains("WHERE cRoot.CodeID IN $seed_root_ids AND pEntity.CUI <> pRoot.CUI RETURN"));
    }

    #[test]
    fn test_display_from_code_term() {
        let seed = Seed::root_subset("HUBMAP", "C000008", "OrganCUI", "term").rooted_in("SENNET").term_from_code();
        let (text, _) = seed.render().unwrap();
        assert!(text.contains("(pEntity:Concept)-[:CODE]->(cEntity:Code), (cEntity)-[rTerm:PT]->(tEntity:Term)"));
        assert!(text.contains("cEntity.SAB = $seed_sab AND rTerm.CUI = pEntity.CUI"));
        assert!(!text.contains("PREF_TERM"));
        assert_eq!(seed.outputs(), vec!["OrganCUI", "term"]);
    }

    #[test]
    fn test_vocabulary_codes_seed() {
        let seed = Seed::vocabulary_codes("HGNC", "GeneCUI").with_code_id("hgnc_id");
        let (text, _) = seed.render().unwrap();
        assert!(text.starts_with("CALL { MATCH (pEntity:Concept)-[:CODE]->(cEntity:Code) WHERE cEntity.SAB = $seed_sab"));
        assert!(!text.contains("isa"));
        assert_eq!(seed.display(), None);
    }

    #[test]
    fn test_children_seed_prefers_earlier_vocabulary() {
        let sabs = vec!["SNOMEDCT_US".to_owned(), "NCI".to_owned()];
        let seed = Seed::children("SENNET", "C020076", sabs, "ChildCUI", "term").with_code("code").with_code_sab("sab");
        let (text, params) = seed.render().unwrap();
        assert_eq!(params.get("seed_sab"), Some(&Value::from("SENNET")));
        assert_eq!(params.get("seed_parent_code"), Some(&Value::from("C020076")));
        assert_eq!(params.get("seed_child_sabs"), Some(&Value::from(vec!["SNOMEDCT_US", "NCI"])));
        assert!(text.contains("ORDER BY [i IN range(0, size($seed_child_sabs) - 1) WHERE $seed_child_sabs[i] = cChild.SAB][0], cChild.CODE"));
        assert!(text.contains("WITH pEntity, head(COLLECT(cChild)) AS cEntity"));
        assert!(text.ends_with(
            "RETURN pEntity.CUI AS ChildCUI, head(COLLECT(tEntity.name)) AS term, cEntity.CODE AS code, cEntity.SAB AS sab }"
        ));
        assert!(!text.contains("C020076"));
    }

    #[test]
    fn test_children_seed_requires_vocabularies() {
        let seed = Seed::children("SENNET", "C020076", Vec::new(), "ChildCUI", "term");
        assert!(matches!(seed.render(), Err(Error::Configuration(_))));
        let seed = Seed::children("", "C020076", vec!["NCI".to_owned()], "ChildCUI", "term");
        assert!(matches!(seed.render(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_assaytype_suffix_stripped() {
        let f = PropertyFragment::relationship("HUBMAP", "AssayClassCUI", "has_assaytype", "assaytype")
            .unwrap()
            .strip_suffix("_assaytype")
            .unwrap();
        let (text, _) = f.render().unwrap();
        assert!(text.contains("RETURN coalesce(head(COLLECT(REPLACE(tProperty.name, '_assaytype', ''))), '') AS assaytype"));
        assert!(PropertyFragment::relationship("HUBMAP", "x", "has_x", "x").unwrap().strip_suffix("a' + 'b").is_err());
    }

    #[test]
    fn test_root_subset_requires_configuration() {
        let seed = Seed::root_subset("HUBMAP", "", "x", "y");
        assert!(matches!(seed.render(), Err(Error::Configuration(_))));
    }
}
