//! # Configuration
//!
//! Loaded once at startup from JSON and shared read-only afterwards.
//!
//! ```json
//! {
//!   "context": "HUBMAP",
//!   "timeout_secs": 10,
//!   "items_per_page": 10,
//!   "schema": { "dataset_root_code": "C004001" },
//!   "backend": { "kind": "bolt", "uri": "bolt://localhost:7687", "user": "neo4j", "password": "..." }
//! }
//! ```
//!
//! Every field is optional; absent fields take the defaults below.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::relationship::check_identifier;
use crate::storage::BackendConfig;
use crate::{Error, Result};

/// Codes that anchor resource families in the ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConstants {
    /// Root of the dataset (assay type) hierarchy, in the context vocabulary.
    pub dataset_root_code: String,
    /// Root of the organ hierarchy.
    pub organ_root_code: String,
    /// Vocabulary the organ root code belongs to.
    pub organ_root_vocabulary: String,
    /// Root of the assay class (rule-based dataset) hierarchy.
    pub assay_class_root_code: String,
    /// Root of the dataset type hierarchy.
    pub dataset_type_root_code: String,
}

impl Default for SchemaConstants {
    fn default() -> Self {
        Self {
            dataset_root_code: "C004001".into(),
            organ_root_code: "C000008".into(),
            organ_root_vocabulary: "SENNET".into(),
            assay_class_root_code: "C200000".into(),
            dataset_type_root_code: "C003041".into(),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Application context vocabulary (`HUBMAP` or `SENNET`).
    pub context: String,
    /// Per-call query timeout.
    pub timeout_secs: u64,
    /// Page size when a list request does not give one.
    pub items_per_page: u64,
    pub schema: SchemaConstants,
    pub backend: BackendConfig,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            context: "HUBMAP".into(),
            timeout_secs: 10,
            items_per_page: 10,
            schema: SchemaConstants::default(),
            backend: BackendConfig::Memory,
        }
    }
}

impl OntologyConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| Error::Configuration(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Configuration("timeout_secs must be greater than zero".into()));
        }
        if self.items_per_page == 0 {
            return Err(Error::Configuration("items_per_page must be greater than zero".into()));
        }
        check_identifier("application context", &self.context)?;
        check_identifier("organ root vocabulary", &self.schema.organ_root_vocabulary)?;
        for (what, code) in [
            ("dataset root code", &self.schema.dataset_root_code),
            ("organ root code", &self.schema.organ_root_code),
            ("assay class root code", &self.schema.assay_class_root_code),
            ("dataset type root code", &self.schema.dataset_type_root_code),
        ] {
            if code.trim().is_empty() {
                return Err(Error::Configuration(format!("{what} is not configured")));
            }
        }
        if let BackendConfig::Bolt { uri, .. } = &self.backend {
            if uri.trim().is_empty() {
                return Err(Error::Configuration("bolt backend needs a uri".into()));
            }
        }
        Ok(())
    }

    /// Context vocabulary, uppercased.
    pub fn context(&self) -> String {
        self.context.to_uppercase()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
