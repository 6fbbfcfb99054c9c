//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "tests"
//! afc_type: "test"
//! afc_scope: "code"
//! afc_description: "End-to-end test case evaluation through a scripted transport."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use afc_conformance::{
    reports::VerdictExporter, run_case, Exchange, ResultTally, Severity,
    SpectrumInquiryTransport, TestOutcome, ValidatorSettings,
};
use afc_common::CaseLogLayer;
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};
use tracing_subscriber::layer::SubscriberExt;

const RULESET: &str = "US_47_CFR_PART_15_SUBPART_E";

/// Replies with a canned exchange and remembers what it was asked to send.
struct ScriptedAfc {
    reply: Exchange,
    sent: Vec<Value>,
}

impl ScriptedAfc {
    fn replying(reply: Exchange) -> Self {
        Self {
            reply,
            sent: Vec::new(),
        }
    }
}

impl SpectrumInquiryTransport for ScriptedAfc {
    fn send(&mut self, request: &Value) -> Exchange {
        self.sent.push(request.clone());
        self.reply.clone()
    }
}

fn request() -> Value {
    json!({
        "version": "1.4",
        "availableSpectrumInquiryRequests": [{
            "requestId": "REQ-SRS1",
            "deviceDescriptor": {
                "serialNumber": "SN-0001",
                "certificationId": [{"rulesetId": RULESET, "id": "FCCID-1"}]
            },
            "location": {
                "elevation": {"height": 3.0, "heightType": "AGL", "verticalUncertainty": 2},
                "ellipse": {
                    "center": {"longitude": -97.0, "latitude": 32.0},
                    "majorAxis": 100, "minorAxis": 50, "orientation": 45
                },
                "indoorDeployment": 2
            },
            "inquiredChannels": [{"globalOperatingClass": 131}]
        }]
    })
}

fn success_mask() -> Value {
    json!({
        "version": "1.4",
        "expectedSpectrumInquiryResponses": [{
            "requestId": "REQ-SRS1",
            "rulesetId": RULESET,
            "expectedResponseCodes": [0],
            "expectedChannelInfo": [{
                "globalOperatingClass": 131,
                "channelCfi": [1, 5],
                "maxEirp": [{"upperBound": 36}, {"upperBound": 30, "lowerBound": 20}]
            }]
        }]
    })
}

fn error_mask() -> Value {
    json!({
        "version": "1.4",
        "expectedSpectrumInquiryResponses": [{
            "requestId": "REQ-SRS1",
            "rulesetId": RULESET,
            "expectedResponseCodes": [102, 103]
        }]
    })
}

fn success_response(eirp_cfi5: f64) -> Value {
    json!({
        "version": "1.4",
        "availableSpectrumInquiryResponses": [{
            "requestId": "REQ-SRS1",
            "rulesetId": RULESET,
            "response": {"responseCode": 0},
            "availableChannelInfo": [{
                "globalOperatingClass": 131,
                "channelCfi": [1, 5],
                "maxEirp": [36, eirp_cfi5]
            }],
            "availabilityExpireTime": "2026-11-01T00:00:00Z"
        }]
    })
}

fn missing_param_response() -> Value {
    json!({
        "version": "1.4",
        "availableSpectrumInquiryResponses": [{
            "requestId": "REQ-SRS1",
            "rulesetId": RULESET,
            "response": {
                "responseCode": 102,
                "supplementalInfo": {"missingParams": ["location"]}
            }
        }]
    })
}

fn messages(verdict: &afc_conformance::CaseVerdict, severity: Severity) -> Vec<&str> {
    verdict
        .violations
        .iter()
        .filter(|v| v.severity == severity)
        .map(|v| v.message.as_str())
        .collect()
}

#[test]
fn response_within_mask_is_expected() {
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(25.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &success_mask(),
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Expected, "{:#?}", verdict.violations);
    assert_eq!(verdict.http_status, Some(200));
    assert_eq!(afc.sent, vec![request()]);
    assert!(messages(&verdict, Severity::Error).is_empty());
}

#[test]
fn response_outside_mask_is_unexpected() {
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(31.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &success_mask(),
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Unexpected);
    let errors = messages(&verdict, Severity::Error);
    assert!(errors.iter().any(|m| m.contains("CFI 5 outside allowed range")));
    assert!(errors
        .iter()
        .any(|m| m.contains("does not meet mask requirements")));
}

#[test]
fn server_error_status_is_unexpected_even_when_content_matches() {
    let mut afc = ScriptedAfc::replying(Exchange::json(500, success_response(25.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &success_mask(),
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Unexpected);
    assert_eq!(verdict.http_status, Some(500));
    let errors = messages(&verdict, Severity::Error);
    assert!(errors[0].contains("Expected HTTP status code of 2XX but received: 500"));
    assert!(errors
        .last()
        .is_some_and(|m| m.contains("HTTP status code is not valid")));
}

#[test]
fn invalid_request_is_still_sent_when_an_error_is_expected() {
    let mut broken = request();
    broken["availableSpectrumInquiryRequests"][0]["location"]["indoorDeployment"] = json!(9);
    let mut afc = ScriptedAfc::replying(Exchange::json(400, missing_param_response()));
    let verdict = run_case(
        &mut afc,
        "AFCS.IBP.1",
        &error_mask(),
        &broken,
        &ValidatorSettings::default(),
    );
    assert_eq!(afc.sent.len(), 1);
    assert_eq!(verdict.outcome, TestOutcome::Expected, "{:#?}", verdict.violations);
    assert!(messages(&verdict, Severity::Warning)
        .iter()
        .any(|m| m.contains("indoorDeployment")));
}

#[test]
fn invalid_request_without_expected_error_is_skipped_unsent() {
    let mut broken = request();
    broken["availableSpectrumInquiryRequests"][0]["location"]["indoorDeployment"] = json!(9);
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(25.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &success_mask(),
        &broken,
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Skipped);
    assert!(afc.sent.is_empty());
    assert_eq!(verdict.http_status, None);
    assert_eq!(
        verdict.violations.last().map(|v| v.severity),
        Some(Severity::Fatal)
    );
}

#[test]
fn invalid_mask_skips_the_case() {
    let mut mask = success_mask();
    mask["expectedSpectrumInquiryResponses"][0]["expectedResponseCodes"] = json!([0, -1]);
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(25.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &mask,
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Skipped);
    assert!(afc.sent.is_empty());
    assert!(messages(&verdict, Severity::Fatal)[0].contains("Response mask does not pass validation"));
}

#[test]
fn undecodable_body_and_missing_response_are_unexpected() {
    let mut afc = ScriptedAfc::replying(Exchange::from_text(200, "<html>gateway</html>"));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &success_mask(),
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Unexpected);
    assert!(messages(&verdict, Severity::Error)
        .iter()
        .any(|m| m.contains("<html>gateway</html>")));

    let mut silent = ScriptedAfc::replying(Exchange::no_response());
    let verdict = run_case(
        &mut silent,
        "AFCS.SRS.1",
        &success_mask(),
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Unexpected);
    assert_eq!(verdict.http_status, None);
}

#[test]
fn success_delivered_with_bad_request_status_is_unexpected() {
    let mask = json!({
        "version": "1.4",
        "expectedSpectrumInquiryResponses": [{
            "requestId": "REQ-SRS1",
            "rulesetId": RULESET,
            "expectedResponseCodes": [-1]
        }]
    });
    let mut afc = ScriptedAfc::replying(Exchange::json(400, success_response(25.0)));
    let verdict = run_case(
        &mut afc,
        "AFCS.SRS.1",
        &mask,
        &request(),
        &ValidatorSettings::default(),
    );
    assert_eq!(verdict.outcome, TestOutcome::Unexpected);
    assert!(messages(&verdict, Severity::Error)
        .iter()
        .any(|m| m.contains("HTTP status code 400")));
}

#[test]
fn verdicts_roll_up_into_tally_and_export() {
    let settings = ValidatorSettings::default();
    let mut tally = ResultTally::new();
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(25.0)));
    for name in ["AFCS.SRS.1", "AFCS.SRS.2"] {
        tally.record(&run_case(&mut afc, name, &success_mask(), &request(), &settings));
    }
    let mut broken = ScriptedAfc::replying(Exchange::json(200, success_response(40.0)));
    let verdict = run_case(&mut broken, "AFCS.SRS.3", &success_mask(), &request(), &settings);
    tally.record(&verdict);

    assert_eq!(tally.count(TestOutcome::Expected), 2);
    assert_eq!(tally.names(TestOutcome::Unexpected), vec!["AFCS.SRS.3"]);

    let dir = tempfile::tempdir().unwrap();
    let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
    let path = VerdictExporter::new(&verdict).export(dir.path(), at).unwrap();
    assert!(path.ends_with("AFCS.SRS.3_verdict_2026-10-19_12-00-00.json"));
    let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["outcome"], "unexpected");
}

#[test]
fn case_log_holds_every_verdict_entry_with_its_severity() {
    let dir = tempfile::tempdir().unwrap();
    let layer = CaseLogLayer::new(dir.path());
    let subscriber = tracing_subscriber::registry().with(layer.clone());
    let mut mask = success_mask();
    mask["expectedSpectrumInquiryResponses"][0]["expectedResponseCodes"] = json!([0, -1]);
    let mut afc = ScriptedAfc::replying(Exchange::json(200, success_response(25.0)));

    let verdict = tracing::subscriber::with_default(subscriber, || {
        run_case(
            &mut afc,
            "AFCS.SRS.9",
            &mask,
            &request(),
            &ValidatorSettings::default(),
        )
    });

    let log = std::fs::read_to_string(layer.log_path("AFCS.SRS.9")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), verdict.violations.len());
    assert!(lines.contains(
        &"(ERROR) Cannot expect SUCCESS and other response codes in the same mask"
    ));
    assert_eq!(
        lines.last(),
        Some(&"(FATAL) Response mask does not pass validation. Test SKIPPED.")
    );
}
