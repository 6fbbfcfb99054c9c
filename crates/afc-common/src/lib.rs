//! ---
//! afc_section: "01-core-functionality"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Shared configuration and logging for the conformance harness."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Shared primitives for the AFC conformance harness workspace.
//! This crate exposes harness configuration loading and tracing setup
//! consumed by the conformance engine and its drivers.

pub mod config;
pub mod logging;

pub use config::{HarnessConfig, LoggingConfig, PathsConfig, TestsConfig, ValidationConfig};
pub use logging::{init_tracing, CaseLogLayer, LogFormat, CASE_SPAN};
