//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "tests"
//! afc_type: "test"
//! afc_scope: "code"
//! afc_description: "Integration tests for response-mask reconciliation."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use afc_conformance::{
    model::{ExpectedResponseMessage, ResponseMessage},
    parse_entity, MaskIntegrityError, MaskRunner, Severity,
};
use serde_json::{json, Value};

const RULESET: &str = "US_47_CFR_PART_15_SUBPART_E";

fn mask(entries: Value) -> ExpectedResponseMessage {
    parse_entity(&json!({
        "version": "1.4",
        "expectedSpectrumInquiryResponses": entries
    }))
    .unwrap()
}

fn responses(entries: Value) -> ResponseMessage {
    parse_entity(&json!({
        "version": "1.4",
        "availableSpectrumInquiryResponses": entries
    }))
    .unwrap()
}

fn channel_mask(id: &str) -> Value {
    json!({
        "requestId": id,
        "rulesetId": RULESET,
        "expectedResponseCodes": [0],
        "expectedChannelInfo": [{
            "globalOperatingClass": 131,
            "channelCfi": [1],
            "maxEirp": [{"upperBound": 30, "lowerBound": 20}]
        }]
    })
}

fn channel_response(id: &str, eirp: f64) -> Value {
    json!({
        "requestId": id,
        "rulesetId": RULESET,
        "response": {"responseCode": 0},
        "availableChannelInfo": [{"globalOperatingClass": 131, "channelCfi": [1], "maxEirp": [eirp]}],
        "availabilityExpireTime": "2026-11-01T00:00:00Z"
    })
}

fn failures(report: &afc_conformance::Report) -> Vec<String> {
    report.failures().map(|v| v.message.clone()).collect()
}

#[test]
fn eirp_inside_mask_band_meets_mask() {
    let report = MaskRunner::default()
        .reconcile_message(
            &mask(json!([channel_mask("A")])),
            &responses(json!([channel_response("A", 25.0)])),
            true,
        )
        .unwrap();
    assert!(report.is_valid(), "{:?}", failures(&report));
}

#[test]
fn eirp_above_mask_band_fails_on_that_channel_only() {
    let runner = MaskRunner::default();
    let expected = mask(json!([channel_mask("A")]));
    let received = responses(json!([channel_response("A", 35.0)]));
    let report = runner
        .reconcile(
            &expected.expected_spectrum_inquiry_responses[0],
            &received.available_spectrum_inquiry_responses[0],
            false,
        )
        .unwrap();
    let failures = failures(&report);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("CFI 1"));
}

#[test]
fn general_failure_mask_against_successful_channel_response() {
    let expected = mask(json!([{
        "requestId": "A",
        "rulesetId": RULESET,
        "expectedResponseCodes": [-1]
    }]));
    let received = responses(json!([channel_response("A", 25.0)]));
    let report = MaskRunner::default()
        .reconcile(
            &expected.expected_spectrum_inquiry_responses[0],
            &received.available_spectrum_inquiry_responses[0],
            false,
        )
        .unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.failure_count(), 2);
}

#[test]
fn repeated_response_id_and_missing_id_fail_the_message() {
    let report = MaskRunner::default()
        .reconcile_message(
            &mask(json!([channel_mask("A"), channel_mask("B")])),
            &responses(json!([channel_response("A", 25.0), channel_response("A", 25.0)])),
            false,
        )
        .unwrap();
    assert!(!report.is_valid());
    let failures = failures(&report);
    assert!(failures.iter().any(|m| m.contains("ID (A), but found 2")));
    assert!(failures.iter().any(|m| m.contains("ID (B), but found 0")));
}

#[test]
fn frequency_sweep_covers_every_subrange() {
    let expected = mask(json!([{
        "requestId": "A",
        "rulesetId": RULESET,
        "expectedResponseCodes": [0],
        "expectedFrequencyInfo": [
            {"frequencyRange": {"lowFrequency": 6000, "highFrequency": 6100}, "maxPsd": {"upperBound": 17}},
            {"frequencyRange": {"lowFrequency": 5925, "highFrequency": 6000}, "maxPsd": {"upperBound": 23}}
        ]
    }]));
    let received = responses(json!([{
        "requestId": "A",
        "rulesetId": RULESET,
        "response": {"responseCode": 0},
        "availableFrequencyInfo": [
            {"frequencyRange": {"lowFrequency": 5925, "highFrequency": 6100}, "maxPsd": 17},
            {"frequencyRange": {"lowFrequency": 5950, "highFrequency": 6150}, "maxPsd": 18}
        ],
        "availabilityExpireTime": "2026-11-01T00:00:00Z"
    }]));
    let report = MaskRunner::default()
        .reconcile_message(&expected, &received, true)
        .unwrap();
    assert_eq!(
        failures(&report),
        vec![
            "Mask violated on 6000 - 6100 MHz. Permitted 18 dBm/MHz but expected x <= 17 dBm/MHz",
            "Transmission disallowed on 6100 - 6150 MHz",
            "Response for requestID (A) violated expected response mask",
        ]
    );
    let matches = report
        .violations()
        .iter()
        .filter(|v| v.severity == Severity::Info && v.message.starts_with("Mask matches"))
        .count();
    assert_eq!(matches, 3);
}

#[test]
fn self_contradicting_mask_aborts_with_its_log() {
    let expected = mask(json!([{
        "requestId": "A",
        "rulesetId": RULESET,
        "expectedResponseCodes": [0],
        "expectedChannelInfo": [
            {"globalOperatingClass": 131, "channelCfi": [1], "maxEirp": [{"upperBound": 30}]},
            {"globalOperatingClass": 131, "channelCfi": [5], "maxEirp": [{"upperBound": 30}]}
        ]
    }]));
    let received = responses(json!([channel_response("A", 25.0)]));
    let runner = MaskRunner::default();

    let err = runner.reconcile_message(&expected, &received, false).unwrap_err();
    assert!(matches!(err, MaskIntegrityError::DuplicateOperatingClass { count: 2, .. }));
    assert!(err
        .violations()
        .iter()
        .any(|v| v.message.contains("Received requestId matches mask (A)")));

    let err = runner.reconcile_message(&expected, &received, true).unwrap_err();
    assert!(matches!(err, MaskIntegrityError::InvalidMask { .. }));
}
