//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Expected response masks.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{FrequencyRange, VendorExtension};
use super::response::ResponseCode;
use crate::validation::{Element, Entity, FieldKind, Schema};

/// Tolerance band for a power value. A missing lower bound means unbounded below.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedPowerRange {
    pub upper_bound: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nominal_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
}

impl ExpectedPowerRange {
    pub fn at_most(upper_bound: f64) -> Self {
        Self {
            upper_bound,
            nominal_value: None,
            lower_bound: None,
        }
    }

    pub fn between(lower_bound: f64, upper_bound: f64) -> Self {
        Self {
            upper_bound,
            nominal_value: None,
            lower_bound: Some(lower_bound),
        }
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound.unwrap_or(f64::NEG_INFINITY)
    }

    /// Inclusive at both ends.
    pub fn in_range(&self, value: f64) -> bool {
        self.lower_bound() <= value && value <= self.upper_bound
    }
}

impl fmt::Display for ExpectedPowerRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lower_bound, self.nominal_value) {
            (None, _) => write!(f, "x <= {}", self.upper_bound),
            (Some(lower), Some(nominal)) => {
                write!(f, "{lower} <= {nominal} <= {}", self.upper_bound)
            }
            (Some(lower), None) => write!(f, "{lower} <= x <= {}", self.upper_bound),
        }
    }
}

impl Entity for ExpectedPowerRange {
    const NAME: &'static str = "ExpectedPowerRange";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("upperBound", FieldKind::number())
            .optional("nominalValue", FieldKind::number())
            .optional("lowerBound", FieldKind::number())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedAvailableFrequencyInfo {
    pub frequency_range: FrequencyRange,
    pub max_psd: ExpectedPowerRange,
}

impl Entity for ExpectedAvailableFrequencyInfo {
    const NAME: &'static str = "ExpectedAvailableFrequencyInfo";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("frequencyRange", FieldKind::object::<FrequencyRange>())
            .required("maxPsd", FieldKind::object::<ExpectedPowerRange>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedAvailableChannelInfo {
    pub global_operating_class: f64,
    pub channel_cfi: Vec<f64>,
    pub max_eirp: Vec<ExpectedPowerRange>,
}

impl ExpectedAvailableChannelInfo {
    /// Entries that only name the operating class carry no channels.
    pub fn is_placeholder(&self) -> bool {
        self.channel_cfi.is_empty() && self.max_eirp.is_empty()
    }
}

impl Entity for ExpectedAvailableChannelInfo {
    const NAME: &'static str = "ExpectedAvailableChannelInfo";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("globalOperatingClass", FieldKind::number())
            .required("channelCfi", FieldKind::list(Element::Number))
            .required("maxEirp", FieldKind::list_of::<ExpectedPowerRange>())
    }
}

fn compare_cfi_lists(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}

fn sort_frequency_info(info: &mut [ExpectedAvailableFrequencyInfo]) {
    info.sort_by(|a, b| {
        a.frequency_range
            .low_frequency
            .total_cmp(&b.frequency_range.low_frequency)
    });
}

fn sort_channel_info(info: &mut [ExpectedAvailableChannelInfo]) {
    info.sort_by(|a, b| compare_cfi_lists(&a.channel_cfi, &b.channel_cfi));
}

/// Mask describing every acceptable response to one inquiry.
///
/// `disallowed_response_codes` is fixed when the mask is built: the explicit list
/// when one was supplied, otherwise every known code that is not expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ExpectedResponseWire", into = "ExpectedResponseWire")]
pub struct ExpectedResponse {
    pub request_id: String,
    pub ruleset_id: String,
    expected_response_codes: Vec<ResponseCode>,
    disallowed_response_codes: Vec<ResponseCode>,
    pub expected_frequency_info: Option<Vec<ExpectedAvailableFrequencyInfo>>,
    pub expected_channel_info: Option<Vec<ExpectedAvailableChannelInfo>>,
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl ExpectedResponse {
    pub fn new(
        request_id: impl Into<String>,
        ruleset_id: impl Into<String>,
        expected_response_codes: Vec<ResponseCode>,
    ) -> Self {
        let disallowed_response_codes = ResponseCode::complement(&expected_response_codes);
        Self {
            request_id: request_id.into(),
            ruleset_id: ruleset_id.into(),
            expected_response_codes,
            disallowed_response_codes,
            expected_frequency_info: None,
            expected_channel_info: None,
            vendor_extensions: None,
        }
    }

    /// Replaces the derived disallowed list with an explicit one.
    pub fn with_disallowed_codes(mut self, codes: Vec<ResponseCode>) -> Self {
        self.disallowed_response_codes = codes;
        self
    }

    pub fn with_frequency_info(mut self, mut info: Vec<ExpectedAvailableFrequencyInfo>) -> Self {
        sort_frequency_info(&mut info);
        self.expected_frequency_info = Some(info);
        self
    }

    pub fn with_channel_info(mut self, mut info: Vec<ExpectedAvailableChannelInfo>) -> Self {
        sort_channel_info(&mut info);
        self.expected_channel_info = Some(info);
        self
    }

    pub fn with_vendor_extensions(mut self, extensions: Vec<VendorExtension>) -> Self {
        self.vendor_extensions = Some(extensions);
        self
    }

    pub fn expected_response_codes(&self) -> &[ResponseCode] {
        &self.expected_response_codes
    }

    pub fn disallowed_response_codes(&self) -> &[ResponseCode] {
        &self.disallowed_response_codes
    }

    /// True when at least one non-SUCCESS code is acceptable.
    pub fn admits_error(&self) -> bool {
        self.expected_response_codes
            .iter()
            .any(|code| !code.is_success())
    }
}

/// Wire form of [`ExpectedResponse`].
///
/// `disallowedResponseCodes` is always written out, so an explicit list survives
/// a save and reload instead of being re-derived from the expected codes.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExpectedResponseWire {
    request_id: String,
    ruleset_id: String,
    expected_response_codes: Vec<ResponseCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disallowed_response_codes: Option<Vec<ResponseCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_frequency_info: Option<Vec<ExpectedAvailableFrequencyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_channel_info: Option<Vec<ExpectedAvailableChannelInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vendor_extensions: Option<Vec<VendorExtension>>,
}

impl From<ExpectedResponseWire> for ExpectedResponse {
    fn from(wire: ExpectedResponseWire) -> Self {
        let mut expected = ExpectedResponse::new(
            wire.request_id,
            wire.ruleset_id,
            wire.expected_response_codes,
        );
        if let Some(codes) = wire.disallowed_response_codes {
            expected = expected.with_disallowed_codes(codes);
        }
        if let Some(info) = wire.expected_frequency_info {
            expected = expected.with_frequency_info(info);
        }
        if let Some(info) = wire.expected_channel_info {
            expected = expected.with_channel_info(info);
        }
        expected.vendor_extensions = wire.vendor_extensions;
        expected
    }
}

impl From<ExpectedResponse> for ExpectedResponseWire {
    fn from(expected: ExpectedResponse) -> Self {
        Self {
            request_id: expected.request_id,
            ruleset_id: expected.ruleset_id,
            expected_response_codes: expected.expected_response_codes,
            disallowed_response_codes: Some(expected.disallowed_response_codes),
            expected_frequency_info: expected.expected_frequency_info,
            expected_channel_info: expected.expected_channel_info,
            vendor_extensions: expected.vendor_extensions,
        }
    }
}

impl Entity for ExpectedResponse {
    const NAME: &'static str = "ExpectedResponse";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("requestId", FieldKind::string())
            .required("rulesetId", FieldKind::string())
            .required("expectedResponseCodes", FieldKind::list(Element::Integer))
            .optional("disallowedResponseCodes", FieldKind::list(Element::Integer))
            .optional(
                "expectedFrequencyInfo",
                FieldKind::list_of::<ExpectedAvailableFrequencyInfo>(),
            )
            .optional(
                "expectedChannelInfo",
                FieldKind::list_of::<ExpectedAvailableChannelInfo>(),
            )
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponseMessage {
    pub version: String,
    pub expected_spectrum_inquiry_responses: Vec<ExpectedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl ExpectedResponseMessage {
    /// Some mask admits a non-SUCCESS code.
    pub fn expects_any_error(&self) -> bool {
        self.expected_spectrum_inquiry_responses
            .iter()
            .any(ExpectedResponse::admits_error)
    }

    /// Every mask admits a non-SUCCESS code.
    pub fn expects_only_error(&self) -> bool {
        self.expected_spectrum_inquiry_responses
            .iter()
            .all(ExpectedResponse::admits_error)
    }
}

impl Entity for ExpectedResponseMessage {
    const NAME: &'static str = "ExpectedResponseMessage";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("version", FieldKind::string())
            .required(
                "expectedSpectrumInquiryResponses",
                FieldKind::list_of::<ExpectedResponse>(),
            )
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parse_entity;
    use serde_json::json;

    #[test]
    fn power_range_is_inclusive_and_unbounded_below_by_default() {
        let range = ExpectedPowerRange::at_most(30.0);
        assert!(range.in_range(30.0));
        assert!(range.in_range(-1.0e9));
        assert!(!range.in_range(30.000_001));
        assert_eq!(range.lower_bound(), f64::NEG_INFINITY);

        let band = ExpectedPowerRange::between(20.0, 30.0);
        assert!(band.in_range(20.0));
        assert!(!band.in_range(19.5));
        assert_eq!(band.to_string(), "20 <= x <= 30");
    }

    #[test]
    fn disallowed_codes_are_derived_once_from_expected_codes() {
        let mask: ExpectedResponse = serde_json::from_value(json!({
            "requestId": "1",
            "rulesetId": "US_47_CFR_PART_15_SUBPART_E",
            "expectedResponseCodes": [102, 103]
        }))
        .unwrap();
        assert_eq!(mask.disallowed_response_codes().len(), 7);
        assert!(!mask.disallowed_response_codes().contains(&ResponseCode::MissingParam));
        assert!(mask.admits_error());
    }

    #[test]
    fn explicit_disallowed_codes_are_kept() {
        let mask: ExpectedResponse = serde_json::from_value(json!({
            "requestId": "1",
            "rulesetId": "US_47_CFR_PART_15_SUBPART_E",
            "expectedResponseCodes": [-1],
            "disallowedResponseCodes": [0]
        }))
        .unwrap();
        assert_eq!(mask.disallowed_response_codes(), &[ResponseCode::Success]);
    }

    #[test]
    fn frequency_and_channel_info_are_sorted_on_construction() {
        let mask: ExpectedResponse = serde_json::from_value(json!({
            "requestId": "1",
            "rulesetId": "r",
            "expectedResponseCodes": [0],
            "expectedFrequencyInfo": [
                {"frequencyRange": {"lowFrequency": 6100, "highFrequency": 6200}, "maxPsd": {"upperBound": 20}},
                {"frequencyRange": {"lowFrequency": 5925, "highFrequency": 6100}, "maxPsd": {"upperBound": 23}}
            ],
            "expectedChannelInfo": [
                {"globalOperatingClass": 133, "channelCfi": [7, 23], "maxEirp": [{"upperBound": 30}, {"upperBound": 30}]},
                {"globalOperatingClass": 131, "channelCfi": [1, 5], "maxEirp": [{"upperBound": 30}, {"upperBound": 30}]}
            ]
        }))
        .unwrap();
        let freq = mask.expected_frequency_info.as_ref().unwrap();
        assert_eq!(freq[0].frequency_range.low_frequency, 5925.0);
        let chan = mask.expected_channel_info.as_ref().unwrap();
        assert_eq!(chan[0].global_operating_class, 131.0);

        let round_trip: ExpectedResponse =
            serde_json::from_value(serde_json::to_value(&mask).unwrap()).unwrap();
        assert_eq!(round_trip, mask);
    }

    #[test]
    fn message_error_expectations() {
        let message = ExpectedResponseMessage {
            version: "1.4".into(),
            expected_spectrum_inquiry_responses: vec![
                ExpectedResponse::new("a", "r", vec![ResponseCode::Success]),
                ExpectedResponse::new("b", "r", vec![ResponseCode::InvalidValue]),
            ],
            vendor_extensions: None,
        };
        assert!(message.expects_any_error());
        assert!(!message.expects_only_error());
    }

    #[test]
    fn mask_message_round_trips_through_parse_entity() {
        let raw = json!({
            "version": "1.4",
            "expectedSpectrumInquiryResponses": [
                {
                    "requestId": "A",
                    "rulesetId": "US_47_CFR_PART_15_SUBPART_E",
                    "expectedResponseCodes": [0],
                    "expectedFrequencyInfo": [
                        {"frequencyRange": {"lowFrequency": 5925, "highFrequency": 6100},
                         "maxPsd": {"upperBound": 23, "nominalValue": 20, "lowerBound": 17}}
                    ],
                    "expectedChannelInfo": [
                        {"globalOperatingClass": 131, "channelCfi": [5, 1],
                         "maxEirp": [{"upperBound": 30, "lowerBound": 20}, {"upperBound": 36}]}
                    ]
                },
                {
                    "requestId": "B",
                    "rulesetId": "US_47_CFR_PART_15_SUBPART_E",
                    "expectedResponseCodes": [102, 103],
                    "disallowedResponseCodes": [0]
                }
            ]
        });
        let message: ExpectedResponseMessage = parse_entity(&raw).unwrap();
        let serialized = serde_json::to_value(&message).unwrap();
        let reparsed: ExpectedResponseMessage = parse_entity(&serialized).unwrap();
        assert_eq!(reparsed, message);
        assert_eq!(
            serialized["expectedSpectrumInquiryResponses"][1]["disallowedResponseCodes"],
            json!([0])
        );

        let success = &reparsed.expected_spectrum_inquiry_responses[0];
        assert_eq!(success.disallowed_response_codes().len(), 8);
        let channels = success.expected_channel_info.as_ref().unwrap();
        assert_eq!(channels[0].channel_cfi, vec![5.0, 1.0]);
        assert_eq!(channels[0].max_eirp[1].upper_bound, 36.0);
        assert_eq!(
            reparsed.expected_spectrum_inquiry_responses[1].disallowed_response_codes(),
            &[ResponseCode::Success]
        );
    }
}
