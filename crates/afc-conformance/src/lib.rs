//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Conformance engine for AFC available spectrum inquiry exchanges.
//!
//! Requests, responses and expected response masks are validated against the
//! protocol rules, then received responses are reconciled with their masks.
//! Validation and reconciliation are synchronous and free of I/O; the [`io`] and
//! [`reports`] modules hold the file handling around them.

pub mod errors;
pub mod geometry;
pub mod harness;
pub mod io;
pub mod mask_runner;
pub mod model;
pub mod reports;
pub mod settings;
pub mod validation;
pub mod validators;

pub use errors::{ConversionError, HarnessError, MaskIntegrityError, Result};
pub use harness::{
    prepare_case, run_case, CaseVerdict, Exchange, ExchangeBody, PreparedCase, ResultTally,
    SpectrumInquiryTransport, TestOutcome,
};
pub use mask_runner::MaskRunner;
pub use settings::ValidatorSettings;
pub use validation::{parse_entity, Checked, Report, Severity, Violation};
pub use validators::{MaskValidator, RequestValidator, ResponseValidator};
