//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use thiserror::Error;

use crate::validation::Violation;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Raised when untyped input cannot be mapped onto the requested entity.
///
/// `violations` holds every shape problem found before conversion was attempted.
#[derive(Debug, Clone, Error)]
#[error("cannot convert input into {entity} at `{path}`: {message}")]
pub struct ConversionError {
    pub entity: &'static str,
    pub path: String,
    pub message: String,
    pub violations: Vec<Violation>,
}

/// The expected response mask contradicts itself; reconciliation cannot proceed.
#[derive(Debug, Clone, Error)]
pub enum MaskIntegrityError {
    #[error("response mask failed validation with {} violation(s)", .violations.len())]
    InvalidMask { violations: Vec<Violation> },
    #[error("response mask has {count} channel entries for globalOperatingClass {goc}")]
    DuplicateOperatingClass {
        goc: f64,
        count: usize,
        violations: Vec<Violation>,
    },
    #[error("response mask lists channelCfi {cfi} {count} times for globalOperatingClass {goc}")]
    DuplicateChannelCfi {
        goc: f64,
        cfi: f64,
        count: usize,
        violations: Vec<Violation>,
    },
}

impl MaskIntegrityError {
    /// Violations recorded up to the point the comparison was aborted.
    pub fn violations(&self) -> &[Violation] {
        match self {
            MaskIntegrityError::InvalidMask { violations }
            | MaskIntegrityError::DuplicateOperatingClass { violations, .. }
            | MaskIntegrityError::DuplicateChannelCfi { violations, .. } => violations,
        }
    }
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    MaskIntegrity(#[from] MaskIntegrityError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
}
