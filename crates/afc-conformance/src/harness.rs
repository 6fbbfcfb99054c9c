//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Per-test-case evaluation.
//!
//! A case is prepared from its mask and request documents, the request is sent
//! through a [`SpectrumInquiryTransport`], and the resulting [`Exchange`] is judged
//! against the mask. Every step logs into the case's own report, which ends up in
//! the [`CaseVerdict`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info_span;

use crate::mask_runner::MaskRunner;
use crate::model::{ExpectedResponseMessage, RequestMessage, ResponseMessage};
use crate::settings::ValidatorSettings;
use crate::validation::{validate_json_into, Report, Violation};
use crate::validators::{MaskValidator, RequestValidator, ResponseValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// The response fits the mask.
    Expected,
    /// The response, or the HTTP exchange carrying it, violates the mask.
    Unexpected,
    /// Inputs could not be used; nothing is implied about the system under test.
    Skipped,
}

impl TestOutcome {
    pub const ALL: [TestOutcome; 3] = [
        TestOutcome::Expected,
        TestOutcome::Unexpected,
        TestOutcome::Skipped,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TestOutcome::Expected => "expected",
            TestOutcome::Unexpected => "unexpected",
            TestOutcome::Skipped => "skipped",
        }
    }

    fn label(self) -> &'static str {
        match self {
            TestOutcome::Expected => "  Expected results",
            TestOutcome::Unexpected => "Unexpected results",
            TestOutcome::Skipped => "     Skipped tests",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Outcomes of a run, in the order cases finished.
#[derive(Debug, Clone, Default)]
pub struct ResultTally {
    results: Vec<(String, TestOutcome)>,
}

impl ResultTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, test_name: impl Into<String>, outcome: TestOutcome) {
        self.results.push((test_name.into(), outcome));
    }

    pub fn record(&mut self, verdict: &CaseVerdict) {
        self.add(verdict.test_name.clone(), verdict.outcome);
    }

    pub fn names(&self, outcome: TestOutcome) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, o)| *o == outcome)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn count(&self, outcome: TestOutcome) -> usize {
        self.results.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn named_results(&self) -> String {
        TestOutcome::ALL
            .iter()
            .map(|outcome| format!("{}: {}", outcome.label(), self.names(*outcome).join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn count_results(&self) -> String {
        TestOutcome::ALL
            .iter()
            .map(|outcome| format!("{}: {}", outcome.label(), self.count(*outcome)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Final judgement of one case together with everything logged while reaching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseVerdict {
    pub test_name: String,
    pub outcome: TestOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub violations: Vec<Violation>,
}

impl CaseVerdict {
    fn new(test_name: &str, outcome: TestOutcome, http_status: Option<u16>, report: Report) -> Self {
        Self {
            test_name: test_name.to_owned(),
            outcome,
            http_status,
            violations: report.into_violations(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeBody {
    Json(Value),
    /// Body text that is not valid JSON.
    Undecodable(String),
}

/// What the transport observed for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    /// `None` when no HTTP response arrived at all.
    pub status: Option<u16>,
    pub body: ExchangeBody,
}

impl Exchange {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status: Some(status),
            body: ExchangeBody::Json(body),
        }
    }

    /// Decodes `text` as JSON, keeping the raw text when that fails.
    pub fn from_text(status: u16, text: impl Into<String>) -> Self {
        let text = text.into();
        let body = match serde_json::from_str(&text) {
            Ok(value) => ExchangeBody::Json(value),
            Err(_) => ExchangeBody::Undecodable(text),
        };
        Self {
            status: Some(status),
            body,
        }
    }

    pub fn no_response() -> Self {
        Self {
            status: None,
            body: ExchangeBody::Undecodable(String::new()),
        }
    }
}

/// Delivers a serialized request message to the system under test.
pub trait SpectrumInquiryTransport {
    fn send(&mut self, request: &Value) -> Exchange;
}

/// A case whose mask is valid and whose request is worth sending.
#[derive(Debug, Clone)]
pub struct PreparedCase {
    pub test_name: String,
    pub mask: ExpectedResponseMessage,
    pub request: Value,
    /// Some mask entry admits a non-SUCCESS code.
    pub expect_any_error: bool,
    /// Every mask entry admits a non-SUCCESS code.
    pub expect_only_error: bool,
    settings: ValidatorSettings,
    report: Report,
}

/// Validates the mask and request of a case. A case that cannot be run comes back
/// as a skipped verdict.
pub fn prepare_case(
    test_name: &str,
    mask_raw: &Value,
    request_raw: &Value,
    settings: &ValidatorSettings,
) -> Result<PreparedCase, CaseVerdict> {
    let span = info_span!("test_case", test = test_name);
    let _entered = span.enter();
    let mut report = Report::new();

    let mask_validator = MaskValidator::new(settings.clone());
    let mask = match validate_json_into::<ExpectedResponseMessage, _>(
        mask_raw,
        Report::detached(),
        |mask, findings| {
            mask_validator.check_message(mask, findings);
        },
    ) {
        Ok(checked) if checked.is_valid() => {
            report.absorb(checked.report);
            report.info("Response mask passes validation.");
            checked.entity
        }
        Ok(checked) => {
            report.absorb(checked.report);
            report.fatal("Response mask does not pass validation. Test SKIPPED.");
            return Err(CaseVerdict::new(test_name, TestOutcome::Skipped, None, report));
        }
        Err(err) => {
            report.absorb(unemitted(err.violations.clone()));
            report.fatal(format!(
                "Encountered error while converting response mask: {err}. Test SKIPPED."
            ));
            return Err(CaseVerdict::new(test_name, TestOutcome::Skipped, None, report));
        }
    };

    let expect_any_error = mask.expects_any_error();
    let expect_only_error = mask.expects_only_error();

    let request_validator = RequestValidator::new(settings.clone());
    let (request_ok, request_findings) = match validate_json_into::<RequestMessage, _>(
        request_raw,
        Report::detached(),
        |request, findings| {
            request_validator.check_message(request, findings);
        },
    ) {
        Ok(checked) => (checked.is_valid(), checked.report),
        Err(err) => (false, unemitted(err.violations)),
    };

    if request_ok {
        report.absorb(request_findings);
        report.info("Request passes validation.");
    } else if expect_any_error {
        report.absorb_as_advisory(request_findings);
        report.info(
            "Request does not pass validation, but mask expects an error, so sending invalid request anyway.",
        );
    } else {
        report.absorb(request_findings);
        report.fatal(
            "Request does not pass validation, and response mask doesn't expect an error. Test SKIPPED.",
        );
        return Err(CaseVerdict::new(test_name, TestOutcome::Skipped, None, report));
    }

    Ok(PreparedCase {
        test_name: test_name.to_owned(),
        mask,
        request: request_raw.clone(),
        expect_any_error,
        expect_only_error,
        settings: settings.clone(),
        report,
    })
}

impl PreparedCase {
    fn accepted_statuses(&self) -> &'static str {
        if self.expect_only_error {
            "2XX or 400"
        } else {
            "2XX"
        }
    }

    /// Judges what came back for this case's request.
    pub fn evaluate(self, exchange: &Exchange) -> CaseVerdict {
        let span = info_span!("test_case", test = %self.test_name);
        let _entered = span.enter();
        let accepted = self.accepted_statuses();
        let mut report = self.report;
        let name = self.test_name.as_str();

        let Some(status) = exchange.status else {
            report.error("Failed to receive an HTTP response from the AFC. Result UNEXPECTED.");
            return CaseVerdict::new(name, TestOutcome::Unexpected, None, report);
        };
        let finish = |outcome, report| CaseVerdict::new(name, outcome, Some(status), report);

        let status_ok =
            (200..=299).contains(&status) || (self.expect_only_error && status == 400);
        let mut http_mismatch = !status_ok;
        if status_ok {
            report.info(format!(
                "Received HTTP status code of {status} is acceptable (expected {accepted})."
            ));
        } else {
            report.error(format!(
                "Expected HTTP status code of {accepted} but received: {status}."
            ));
        }

        let body = match &exchange.body {
            ExchangeBody::Json(body) => body,
            ExchangeBody::Undecodable(text) => {
                report.error(format!(
                    "Received response could not be decoded as valid JSON. Raw response text: \"{text}\". Result UNEXPECTED."
                ));
                return finish(TestOutcome::Unexpected, report);
            }
        };

        let response_validator = ResponseValidator::new(self.settings.clone());
        let response = match validate_json_into::<ResponseMessage, _>(
            body,
            Report::detached(),
            |response, findings| {
                response_validator.check_message(response, findings);
            },
        ) {
            Ok(checked) => {
                if checked.is_valid() {
                    report.absorb(checked.report);
                    report.info("Response content appears valid.");
                } else {
                    report.absorb_as_advisory(checked.report);
                    report.warning("Response content does NOT appear valid. Will attempt test anyway...");
                }
                checked.entity
            }
            Err(err) => {
                report.absorb_as_advisory(unemitted(err.violations.clone()));
                report.fatal(format!(
                    "Error converting response for comparison: {err}. Test SKIPPED."
                ));
                return finish(TestOutcome::Skipped, report);
            }
        };

        if status == 400
            && response
                .available_spectrum_inquiry_responses
                .iter()
                .any(|r| r.code().is_success())
        {
            report.error(
                "Response message contains successful responses, but was delivered with HTTP status code 400 (BAD_REQUEST).",
            );
            http_mismatch = true;
        }

        let runner = MaskRunner::new(self.settings.clone());
        match runner.reconcile_message(&self.mask, &response, false) {
            Ok(comparison) => {
                let meets_mask = comparison.is_valid();
                report.absorb(comparison);
                if !meets_mask {
                    report.error("Response does not meet mask requirements. Result UNEXPECTED.");
                    finish(TestOutcome::Unexpected, report)
                } else if http_mismatch {
                    report.error(
                        "Response content meets mask requirements, but HTTP status code is not valid (see prior error). Result UNEXPECTED.",
                    );
                    finish(TestOutcome::Unexpected, report)
                } else {
                    report.info("Response meets mask requirements. Result EXPECTED.");
                    finish(TestOutcome::Expected, report)
                }
            }
            Err(err) => {
                report.absorb(Report::from_emitted(err.violations().to_vec()));
                report.fatal(format!(
                    "Encountered error while evaluating response: {err}. Test SKIPPED."
                ));
                finish(TestOutcome::Skipped, report)
            }
        }
    }
}

/// Report for violations collected in a detached pass; absorbing it emits them.
fn unemitted(violations: Vec<Violation>) -> Report {
    let mut findings = Report::detached();
    for violation in violations {
        findings.record(violation.severity, violation.message);
    }
    findings
}

/// Prepares a case, sends its request when it can run, and judges the exchange.
pub fn run_case<T: SpectrumInquiryTransport + ?Sized>(
    transport: &mut T,
    test_name: &str,
    mask_raw: &Value,
    request_raw: &Value,
    settings: &ValidatorSettings,
) -> CaseVerdict {
    match prepare_case(test_name, mask_raw, request_raw, settings) {
        Ok(case) => {
            let exchange = transport.send(&case.request);
            case.evaluate(&exchange)
        }
        Err(skipped) => skipped,
    }
}
