//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{Entity, FieldKind, Schema};

/// Half-open frequency interval `[lowFrequency, highFrequency)` in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyRange {
    pub low_frequency: f64,
    pub high_frequency: f64,
}

impl FrequencyRange {
    pub fn new(low_frequency: f64, high_frequency: f64) -> Self {
        Self {
            low_frequency,
            high_frequency,
        }
    }

    /// Ranges sharing only an endpoint do not overlap.
    pub fn overlaps(&self, other: &FrequencyRange) -> bool {
        self.low_frequency < other.high_frequency && other.low_frequency < self.high_frequency
    }
}

impl fmt::Display for FrequencyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} MHz", self.low_frequency, self.high_frequency)
    }
}

impl Entity for FrequencyRange {
    const NAME: &'static str = "FrequencyRange";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("lowFrequency", FieldKind::number())
            .required("highFrequency", FieldKind::number())
    }
}

/// Opaque vendor payload; type-checked only, never compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorExtension {
    pub extension_id: String,
    pub parameters: Value,
}

impl Entity for VendorExtension {
    const NAME: &'static str = "VendorExtension";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("extensionId", FieldKind::string())
            .required("parameters", FieldKind::any())
    }
}
