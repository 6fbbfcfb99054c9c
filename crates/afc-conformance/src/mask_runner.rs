//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Reconciliation of received responses against expected response masks.
//!
//! Every check runs even after an earlier mismatch, so one pass reports all the
//! ways a response misses its mask. Passing checks are logged at info level.
//! Only a self-contradictory mask stops a comparison, and it does so with a
//! [`MaskIntegrityError`] carrying the log recorded so far.

use tracing::debug;

use crate::errors::MaskIntegrityError;
use crate::model::{
    AvailableChannelInfo, AvailableFrequencyInfo, ExpectedAvailableChannelInfo,
    ExpectedAvailableFrequencyInfo, ExpectedResponse, ExpectedResponseMessage, InquiryResponse,
    ResponseMessage,
};
use crate::settings::ValidatorSettings;
use crate::validation::Report;
use crate::validators::{MaskValidator, ResponseValidator};

/// Compares received responses with masks, optionally re-validating both first.
#[derive(Debug, Clone, Default)]
pub struct MaskRunner {
    response_validator: ResponseValidator,
    mask_validator: MaskValidator,
}

impl MaskRunner {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self {
            response_validator: ResponseValidator::new(settings.clone()),
            mask_validator: MaskValidator::new(settings),
        }
    }

    /// Reconciles one response with its mask. The response meets the mask when the
    /// returned report [`is_valid`](Report::is_valid).
    pub fn reconcile(
        &self,
        expected: &ExpectedResponse,
        received: &InquiryResponse,
        revalidate: bool,
    ) -> Result<Report, MaskIntegrityError> {
        let mut report = Report::new();
        if revalidate {
            let mut response_report = Report::detached();
            let response_ok = self
                .response_validator
                .check_inquiry_response(received, &mut response_report);
            self.note_response_validation(response_ok, response_report, &mut report);

            let mut mask_report = Report::detached();
            let mask_ok = self
                .mask_validator
                .check_expected_response(expected, &mut mask_report);
            self.require_valid_mask(mask_ok, mask_report, &mut report)?;
        }
        reconcile_into(expected, received, &mut report)?;
        Ok(report)
    }

    /// Reconciles a whole response message with a mask message.
    pub fn reconcile_message(
        &self,
        expected: &ExpectedResponseMessage,
        received: &ResponseMessage,
        revalidate: bool,
    ) -> Result<Report, MaskIntegrityError> {
        let mut report = Report::new();
        if revalidate {
            let mut response_report = Report::detached();
            let response_ok = self
                .response_validator
                .check_message(received, &mut response_report);
            self.note_response_validation(response_ok, response_report, &mut report);

            let mut mask_report = Report::detached();
            let mask_ok = self.mask_validator.check_message(expected, &mut mask_report);
            self.require_valid_mask(mask_ok, mask_report, &mut report)?;
        }

        if received.version != expected.version {
            report.error(format!(
                "Received version ({}) does not match mask version ({})",
                received.version, expected.version
            ));
        }

        let masks = &expected.expected_spectrum_inquiry_responses;
        let responses = &received.available_spectrum_inquiry_responses;
        if responses.len() != masks.len() {
            report.error(format!(
                "Received message has unexpected number of responses. Received {} but expected {}",
                responses.len(),
                masks.len()
            ));
        }

        for mask in masks {
            let matching: Vec<&InquiryResponse> = responses
                .iter()
                .filter(|response| response.request_id == mask.request_id)
                .collect();
            let [response] = matching.as_slice() else {
                report.error(format!(
                    "Expected one response with ID ({}), but found {}",
                    mask.request_id,
                    matching.len()
                ));
                continue;
            };
            if reconcile_into(mask, response, &mut report)? {
                report.info(format!(
                    "Response for requestID ({}) satisfies expected response mask",
                    response.request_id
                ));
            } else {
                report.error(format!(
                    "Response for requestID ({}) violated expected response mask",
                    response.request_id
                ));
            }
        }

        for response in responses {
            let known = masks.iter().any(|mask| mask.request_id == response.request_id);
            report.require(known, || {
                format!(
                    "Received response with unexpected ID ({})",
                    response.request_id
                )
            });
        }

        warn_vendor_extensions(
            received.vendor_extensions.is_some(),
            expected.vendor_extensions.is_some(),
            &mut report,
        );
        Ok(report)
    }

    fn note_response_validation(&self, valid: bool, findings: Report, report: &mut Report) {
        report.absorb_as_advisory(findings);
        if valid {
            report.info("Received response passes validation");
        } else {
            report.warning("Received response does not pass validation; errors in comparison may result");
        }
    }

    fn require_valid_mask(
        &self,
        valid: bool,
        findings: Report,
        report: &mut Report,
    ) -> Result<(), MaskIntegrityError> {
        report.absorb(findings);
        if valid {
            report.info("Response mask passes validation");
            return Ok(());
        }
        report.fatal("Response mask does not pass validation; stopping comparison");
        Err(MaskIntegrityError::InvalidMask {
            violations: report.violations().to_vec(),
        })
    }
}

/// Runs every comparison of one response against one mask into `report`.
/// Returns whether none of them failed.
fn reconcile_into(
    expected: &ExpectedResponse,
    received: &InquiryResponse,
    report: &mut Report,
) -> Result<bool, MaskIntegrityError> {
    let before = report.failure_count();
    debug!(request_id = %received.request_id, "reconciling response with mask");

    if expected.request_id == received.request_id {
        report.info(format!("Received requestId matches mask ({})", expected.request_id));
    } else {
        report.error(format!(
            "Received requestId ({}) does not match mask ({})",
            received.request_id, expected.request_id
        ));
    }

    if expected.ruleset_id == received.ruleset_id {
        report.info(format!("Received rulesetId matches mask ({})", expected.ruleset_id));
    } else {
        report.error(format!(
            "Received rulesetId ({}) does not match mask ({})",
            received.ruleset_id, expected.ruleset_id
        ));
    }

    check_response_code(expected, received, report);

    if let Some(received_info) = &received.available_frequency_info {
        match &expected.expected_frequency_info {
            None => report.error("Response contains frequency info but mask does not"),
            Some(mask_info) => {
                for info in received_info {
                    sweep_frequency_info(info, mask_info, report);
                }
            }
        }
    }

    if let Some(received_info) = &received.available_channel_info {
        match &expected.expected_channel_info {
            None => report.error("Response contains channel info but mask does not"),
            Some(mask_info) => {
                for info in received_info {
                    match_channel_class(info, mask_info, report)?;
                }
            }
        }
    }

    warn_vendor_extensions(
        received.vendor_extensions.is_some(),
        expected.vendor_extensions.is_some(),
        report,
    );
    Ok(report.failure_count() == before)
}

/// Expected codes pass, disallowed codes fail, anything else is probably vendor specific.
fn check_response_code(expected: &ExpectedResponse, received: &InquiryResponse, report: &mut Report) {
    let code = received.code();
    let expected_codes = expected.expected_response_codes();
    let listed = expected_codes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    if expected_codes.contains(&code) {
        report.info(format!(
            "Received response code ({code}) matches mask codes ({listed})"
        ));
    } else if expected.disallowed_response_codes().contains(&code) {
        report.error(format!(
            "Received disallowed response code: {code} (Expected: {listed})"
        ));
    } else {
        report.warning(format!(
            "Received unexpected response code: {code}. Possibly vendor extension?"
        ));
    }
}

/// Walks the received range left to right. Each step either lands inside a mask
/// entry (PSD compared, cursor jumps to that entry's high end) or in a gap (the
/// gap up to the next mask entry is disallowed, cursor jumps past it).
fn sweep_frequency_info(
    received: &AvailableFrequencyInfo,
    mask: &[ExpectedAvailableFrequencyInfo],
    report: &mut Report,
) {
    let low = received.frequency_range.low_frequency;
    let high = received.frequency_range.high_frequency;
    let psd = received.max_psd;

    let mut cursor = low;
    while cursor < high {
        let mut disallowed_low = low;
        let mut disallowed_high = high;
        let mut covering = None;
        for entry in mask {
            let range = &entry.frequency_range;
            if range.high_frequency <= cursor {
                disallowed_low = disallowed_low.max(range.high_frequency);
            } else if range.low_frequency > cursor {
                disallowed_high = disallowed_high.min(range.low_frequency);
            } else {
                covering = Some(entry);
                break;
            }
        }

        match covering {
            Some(entry) => {
                let end = entry.frequency_range.high_frequency.min(high);
                if entry.max_psd.in_range(psd) {
                    report.info(format!(
                        "Mask matches on {cursor} - {end} MHz. Permitted {psd} dBm/MHz and expected {} dBm/MHz",
                        entry.max_psd
                    ));
                } else {
                    report.error(format!(
                        "Mask violated on {cursor} - {end} MHz. Permitted {psd} dBm/MHz but expected {} dBm/MHz",
                        entry.max_psd
                    ));
                }
                cursor = entry.frequency_range.high_frequency;
            }
            None => {
                debug!(disallowed_low, disallowed_high, "no mask entry covers {cursor} MHz");
                report.error(format!(
                    "Transmission disallowed on {cursor} - {disallowed_high} MHz"
                ));
                cursor = disallowed_high;
            }
        }
    }
}

/// Compares one received operating class with the single non-placeholder mask
/// entry for the same class.
fn match_channel_class(
    received: &AvailableChannelInfo,
    mask: &[ExpectedAvailableChannelInfo],
    report: &mut Report,
) -> Result<(), MaskIntegrityError> {
    let goc = received.global_operating_class;
    let candidates: Vec<&ExpectedAvailableChannelInfo> = mask
        .iter()
        .filter(|entry| entry.global_operating_class == goc && !entry.is_placeholder())
        .collect();

    let class = match candidates.as_slice() {
        [] => {
            let placeholder = received.channel_cfi.is_empty() && received.max_eirp.is_empty();
            report.require(placeholder, || {
                format!("No allowed channels provided for GOC {goc}, but response includes them")
            });
            return Ok(());
        }
        [class] => *class,
        many => {
            report.fatal(format!(
                "Error in mask -- found multiple channel info objs with same globalOperatingClass ({goc})"
            ));
            return Err(MaskIntegrityError::DuplicateOperatingClass {
                goc,
                count: many.len(),
                violations: report.violations().to_vec(),
            });
        }
    };

    for (&cfi, &eirp) in received.channel_cfi.iter().zip(&received.max_eirp) {
        let allowed: Vec<_> = class
            .channel_cfi
            .iter()
            .zip(&class.max_eirp)
            .filter(|(mask_cfi, _)| **mask_cfi == cfi)
            .map(|(_, range)| range)
            .collect();

        let range = match allowed.as_slice() {
            [] => {
                report.error(format!(
                    "GOC {goc} with CFI {cfi} not permitted by mask, but response permits it"
                ));
                continue;
            }
            [range] => *range,
            many => {
                report.fatal(format!(
                    "Error in mask -- found multiple channel masks with GOC {goc} and channelCfi {cfi}"
                ));
                return Err(MaskIntegrityError::DuplicateChannelCfi {
                    goc,
                    cfi,
                    count: many.len(),
                    violations: report.violations().to_vec(),
                });
            }
        };

        if range.in_range(eirp) {
            report.info(format!(
                "AFC response for GOC {goc} and CFI {cfi} within allowed range. \
                 Permitted {eirp} dBm and expected {range} dBm"
            ));
        } else {
            report.error(format!(
                "AFC response for GOC {goc} and CFI {cfi} outside allowed range. \
                 Permitted {eirp} dBm but expected {range} dBm"
            ));
        }
    }
    Ok(())
}

fn warn_vendor_extensions(received: bool, expected: bool, report: &mut Report) {
    if received {
        report.warning("Received message contains VendorExtensions, but extensions will not be tested");
    }
    if expected {
        report.warning(
            "Expected response mask contains VendorExtensions, but extensions will not be tested",
        );
    }
}
