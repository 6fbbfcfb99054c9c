//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Violation accumulator shared by the validators and the mask runner.
//!
//! Every check records into a [`Report`] no matter what was recorded before it,
//! so a single pass surfaces all problems. A report is valid while it holds no
//! `Error` or `Fatal` entries.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Confirmation that a check passed.
    Info,
    /// Soft rule violated; advisory only.
    Warning,
    /// Hard rule violated; the enclosing result becomes invalid.
    Error,
    /// Unrecoverable input; the enclosing operation is aborted.
    Fatal,
}

impl Severity {
    pub fn is_failure(self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub message: String,
}

impl Violation {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    fn emit(&self) {
        match self.severity {
            Severity::Info => info!(severity = %self.severity, "{}", self.message),
            Severity::Warning => warn!(severity = %self.severity, "{}", self.message),
            Severity::Error => error!(severity = %self.severity, "{}", self.message),
            Severity::Fatal => {
                error!(severity = %self.severity, fatal = true, "{}", self.message)
            }
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.severity.as_str().to_uppercase(), self.message)
    }
}

/// Ordered log of violations produced by one validation or reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    violations: Vec<Violation>,
    #[serde(skip, default = "emitting")]
    emit: bool,
}

fn emitting() -> bool {
    true
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Report {
    fn eq(&self, other: &Self) -> bool {
        self.violations == other.violations
    }
}

impl Report {
    /// Report that forwards every entry to `tracing` as it is recorded.
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            emit: true,
        }
    }

    /// Report that stays silent until it is absorbed into an emitting report.
    pub fn detached() -> Self {
        Self {
            violations: Vec::new(),
            emit: false,
        }
    }

    /// Wraps violations that were already forwarded to `tracing` elsewhere.
    pub fn from_emitted(violations: Vec<Violation>) -> Self {
        Self {
            violations,
            emit: true,
        }
    }

    pub fn record(&mut self, severity: Severity, message: impl Into<String>) {
        let violation = Violation::new(severity, message);
        if self.emit {
            violation.emit();
        }
        self.violations.push(violation);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(Severity::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Severity::Error, message);
    }

    pub fn fatal(&mut self, message: impl Into<String>) {
        self.record(Severity::Fatal, message);
    }

    /// Records an error when `condition` does not hold. Returns `condition`.
    pub fn require(&mut self, condition: bool, message: impl FnOnce() -> String) -> bool {
        if !condition {
            self.error(message());
        }
        condition
    }

    /// Records a warning when `condition` does not hold. Returns `condition`.
    pub fn advise(&mut self, condition: bool, message: impl FnOnce() -> String) -> bool {
        if !condition {
            self.warning(message());
        }
        condition
    }

    /// Runs `checks` against this report and tells whether they added any failure.
    pub fn section<F>(&mut self, checks: F) -> bool
    where
        F: FnOnce(&mut Report),
    {
        let before = self.failure_count();
        checks(self);
        self.failure_count() == before
    }

    /// Appends another report, emitting its entries if it was detached.
    pub fn absorb(&mut self, other: Report) {
        for violation in other.violations {
            if self.emit && !other.emit {
                violation.emit();
            }
            self.violations.push(violation);
        }
    }

    /// Appends another report with failures demoted to warnings.
    pub fn absorb_as_advisory(&mut self, other: Report) {
        for mut violation in other.violations {
            if violation.severity.is_failure() {
                violation.severity = Severity::Warning;
            }
            if self.emit {
                violation.emit();
            }
            self.violations.push(violation);
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.violations.iter().any(|v| v.severity.is_failure())
    }

    pub fn failure_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity.is_failure())
            .count()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == severity)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(|v| v.severity.is_failure())
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}
