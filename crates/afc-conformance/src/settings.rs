//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use afc_common::ValidationConfig;
use serde::{Deserialize, Serialize};

use crate::geometry::PolygonLimits;

/// Fixed rule parameters shared by the protocol validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSettings {
    pub supported_versions: Vec<String>,
    pub known_ruleset_ids: Vec<String>,
    pub polygon: PolygonLimits,
}

impl ValidatorSettings {
    /// Same settings with polygon advisories promoted to errors.
    pub fn strict(mut self) -> Self {
        self.polygon.strict = true;
        self
    }

    pub fn supports_version(&self, version: &str) -> bool {
        self.supported_versions.iter().any(|v| v == version)
    }

    pub fn knows_ruleset(&self, ruleset_id: &str) -> bool {
        self.known_ruleset_ids.iter().any(|r| r == ruleset_id)
    }
}

impl From<&ValidationConfig> for ValidatorSettings {
    fn from(config: &ValidationConfig) -> Self {
        Self {
            supported_versions: config.supported_versions.clone(),
            known_ruleset_ids: config.known_ruleset_ids.clone(),
            polygon: PolygonLimits {
                min_vertices: config.min_vertices,
                max_vertices: config.max_vertices,
                min_spacing_m: config.min_vertex_spacing_m,
                max_spacing_m: config.max_vertex_spacing_m,
                strict: config.strict_geometry,
            },
        }
    }
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self::from(&ValidationConfig::default())
    }
}
