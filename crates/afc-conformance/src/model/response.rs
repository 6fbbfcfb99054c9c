//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Available spectrum inquiry response entities.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::common::{FrequencyRange, VendorExtension};
use crate::validation::{Element, Entity, FieldKind, Schema};

/// Outcome of an inquiry. Codes outside the protocol table are kept as `Vendor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum ResponseCode {
    GeneralFailure,
    Success,
    VersionNotSupported,
    DeviceDisallowed,
    MissingParam,
    InvalidValue,
    UnexpectedParam,
    UnsupportedSpectrum,
    UnsupportedBasis,
    Vendor(i64),
}

impl ResponseCode {
    /// Every code defined by the protocol, in table order.
    pub const KNOWN: [ResponseCode; 9] = [
        ResponseCode::GeneralFailure,
        ResponseCode::Success,
        ResponseCode::VersionNotSupported,
        ResponseCode::DeviceDisallowed,
        ResponseCode::MissingParam,
        ResponseCode::InvalidValue,
        ResponseCode::UnexpectedParam,
        ResponseCode::UnsupportedSpectrum,
        ResponseCode::UnsupportedBasis,
    ];

    pub fn value(self) -> i64 {
        match self {
            ResponseCode::GeneralFailure => -1,
            ResponseCode::Success => 0,
            ResponseCode::VersionNotSupported => 100,
            ResponseCode::DeviceDisallowed => 101,
            ResponseCode::MissingParam => 102,
            ResponseCode::InvalidValue => 103,
            ResponseCode::UnexpectedParam => 106,
            ResponseCode::UnsupportedSpectrum => 300,
            ResponseCode::UnsupportedBasis => 301,
            ResponseCode::Vendor(code) => code,
        }
    }

    pub fn from_value(value: i64) -> Self {
        match value {
            -1 => ResponseCode::GeneralFailure,
            0 => ResponseCode::Success,
            100 => ResponseCode::VersionNotSupported,
            101 => ResponseCode::DeviceDisallowed,
            102 => ResponseCode::MissingParam,
            103 => ResponseCode::InvalidValue,
            106 => ResponseCode::UnexpectedParam,
            300 => ResponseCode::UnsupportedSpectrum,
            301 => ResponseCode::UnsupportedBasis,
            other => ResponseCode::Vendor(other),
        }
    }

    pub fn is_known(self) -> bool {
        !matches!(self, ResponseCode::Vendor(_))
    }

    pub fn is_success(self) -> bool {
        self == ResponseCode::Success
    }

    pub fn name(self) -> &'static str {
        match self {
            ResponseCode::GeneralFailure => "GENERAL_FAILURE",
            ResponseCode::Success => "SUCCESS",
            ResponseCode::VersionNotSupported => "VERSION_NOT_SUPPORTED",
            ResponseCode::DeviceDisallowed => "DEVICE_DISALLOWED",
            ResponseCode::MissingParam => "MISSING_PARAM",
            ResponseCode::InvalidValue => "INVALID_VALUE",
            ResponseCode::UnexpectedParam => "UNEXPECTED_PARAM",
            ResponseCode::UnsupportedSpectrum => "UNSUPPORTED_SPECTRUM",
            ResponseCode::UnsupportedBasis => "UNSUPPORTED_BASIS",
            ResponseCode::Vendor(_) => "VENDOR_SPECIFIC",
        }
    }

    /// Known codes not in `codes`.
    pub fn complement(codes: &[ResponseCode]) -> Vec<ResponseCode> {
        Self::KNOWN
            .iter()
            .copied()
            .filter(|code| !codes.contains(code))
            .collect()
    }
}

impl From<i64> for ResponseCode {
    fn from(value: i64) -> Self {
        ResponseCode::from_value(value)
    }
}

impl From<ResponseCode> for i64 {
    fn from(code: ResponseCode) -> Self {
        code.value()
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.value())
    }
}

/// Names of the request parameters that caused a failure code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unexpected_params: Option<Vec<String>>,
}

impl SupplementalInfo {
    /// Populated fields as `(wire name, values)` pairs.
    pub fn populated(&self) -> Vec<(&'static str, &[String])> {
        [
            ("missingParams", self.missing_params.as_deref()),
            ("invalidParams", self.invalid_params.as_deref()),
            ("unexpectedParams", self.unexpected_params.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, values)| values.map(|values| (name, values)))
        .collect()
    }
}

impl Entity for SupplementalInfo {
    const NAME: &'static str = "SupplementalInfo";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .optional("missingParams", FieldKind::list(Element::Str))
            .optional("invalidParams", FieldKind::list(Element::Str))
            .optional("unexpectedParams", FieldKind::list(Element::Str))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub response_code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplemental_info: Option<SupplementalInfo>,
}

impl Entity for Response {
    const NAME: &'static str = "Response";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("responseCode", FieldKind::integer())
            .optional("shortDescription", FieldKind::string())
            .optional("supplementalInfo", FieldKind::object::<SupplementalInfo>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFrequencyInfo {
    pub frequency_range: FrequencyRange,
    /// dBm/MHz.
    pub max_psd: f64,
}

impl Entity for AvailableFrequencyInfo {
    const NAME: &'static str = "AvailableFrequencyInfo";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("frequencyRange", FieldKind::object::<FrequencyRange>())
            .required("maxPsd", FieldKind::number())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableChannelInfo {
    pub global_operating_class: f64,
    pub channel_cfi: Vec<f64>,
    /// dBm, one entry per CFI.
    pub max_eirp: Vec<f64>,
}

impl Entity for AvailableChannelInfo {
    const NAME: &'static str = "AvailableChannelInfo";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("globalOperatingClass", FieldKind::number())
            .required("channelCfi", FieldKind::list(Element::Number))
            .required("maxEirp", FieldKind::list(Element::Number))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryResponse {
    pub request_id: String,
    pub ruleset_id: String,
    pub response: Response,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_frequency_info: Option<Vec<AvailableFrequencyInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_channel_info: Option<Vec<AvailableChannelInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_expire_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl InquiryResponse {
    pub fn code(&self) -> ResponseCode {
        self.response.response_code
    }
}

impl Entity for InquiryResponse {
    const NAME: &'static str = "InquiryResponse";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("requestId", FieldKind::string())
            .required("rulesetId", FieldKind::string())
            .required("response", FieldKind::object::<Response>())
            .optional(
                "availableFrequencyInfo",
                FieldKind::list_of::<AvailableFrequencyInfo>(),
            )
            .optional(
                "availableChannelInfo",
                FieldKind::list_of::<AvailableChannelInfo>(),
            )
            .optional("availabilityExpireTime", FieldKind::string())
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMessage {
    pub version: String,
    pub available_spectrum_inquiry_responses: Vec<InquiryResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl Entity for ResponseMessage {
    const NAME: &'static str = "ResponseMessage";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("version", FieldKind::string())
            .required(
                "availableSpectrumInquiryResponses",
                FieldKind::list_of::<InquiryResponse>(),
            )
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}
