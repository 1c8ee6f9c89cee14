//! External references: `SAB:ID` codes resolved to catalogue URLs.

use std::fmt;

use crate::model::DomainObject;

use super::FIELD_SEP;

/// A normalized reference vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    Entrez,
    UniProtKb,
    Ensembl,
    Omim,
    /// HGNC gene symbols. `HGNC` and `HUGO` both resolve here.
    Hugo,
    /// Anything else, lowercased.
    Other(String),
}

impl Vocabulary {
    pub fn resolve(sab: &str) -> Self {
        match sab.trim().to_lowercase().as_str() {
            "entrez" => Vocabulary::Entrez,
            "uniprotkb" => Vocabulary::UniProtKb,
            "ensembl" => Vocabulary::Ensembl,
            "omim" => Vocabulary::Omim,
            "hgnc" | "hugo" => Vocabulary::Hugo,
            other => Vocabulary::Other(other.to_owned()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Vocabulary::Entrez => "entrez",
            Vocabulary::UniProtKb => "uniprotkb",
            Vocabulary::Ensembl => "ensembl",
            Vocabulary::Omim => "omim",
            Vocabulary::Hugo => "hugo",
            Vocabulary::Other(name) => name,
        }
    }

    /// Catalogue page for `id`; `""` for vocabularies without one.
    pub fn url(&self, id: &str) -> String {
        match self {
            Vocabulary::Entrez => format!("https://www.ncbi.nlm.nih.gov/gene/{id}"),
            Vocabulary::UniProtKb => format!("https://www.uniprot.org/uniprotkb/{id}/entry"),
            Vocabulary::Ensembl => {
                format!("http://useast.ensembl.org/Homo_sapiens/Gene/Summary?g={id}")
            }
            Vocabulary::Omim => format!("https://www.omim.org/entry/{id}"),
            Vocabulary::Hugo => {
                format!("https://www.genenames.org/data/gene-symbol-report/#!/hgnc_id/HGNC:{id}")
            }
            Vocabulary::Other(_) => String::new(),
        }
    }
}

impl fmt::Display for Vocabulary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a code into vocabulary and id. Accepts `SAB:ID` and the legacy
/// `SAB ID` form; a code with neither has an empty vocabulary.
pub fn split_code(code: &str) -> (Vocabulary, String) {
    let code = code.trim();
    match code.split_once(':').or_else(|| code.split_once(' ')) {
        Some((sab, id)) => (Vocabulary::resolve(sab), id.trim().to_owned()),
        None => (Vocabulary::Other(String::new()), code.to_owned()),
    }
}

/// Decode a reference record whose first `|` part is a code, e.g.
/// `HGNC:7178|MMRN1|MMRN1`, into `{id, source, url}`.
pub fn decode_reference(record: &str) -> DomainObject {
    let code = record.split(FIELD_SEP).next().unwrap_or_default();
    let (vocabulary, id) = split_code(code);
    let url = if id.is_empty() { String::new() } else { vocabulary.url(&id) };
    DomainObject::new()
        .with("id", id)
        .with("source", vocabulary.name())
        .with("url", url)
}
