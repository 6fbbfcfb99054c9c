//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde_json::Value;

use super::{check_frequency_range, check_unique_ids, check_vendor_extensions, check_version};
use crate::errors::ConversionError;
use crate::model::{
    AvailableChannelInfo, AvailableFrequencyInfo, InquiryResponse, Response, ResponseCode,
    ResponseMessage, SupplementalInfo,
};
use crate::settings::ValidatorSettings;
use crate::validation::{validate_json, with_common, Checked, Report};

const CLOCK_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Whether `value` is an ISO 8601 timestamp with a trailing `Z`.
///
/// The part before `Z` may be a bare date or a date and time separated by `T`
/// or a space. The time may stop at the hour and may carry a `+HH:MM` offset.
pub fn is_utc_timestamp(value: &str) -> bool {
    let Some(body) = value.strip_suffix('Z') else {
        return false;
    };
    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }
    let Some((date, time)) = body.split_once(['T', ' ']) else {
        return NaiveDate::parse_from_str(body, "%Y-%m-%d").is_ok();
    };
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return false;
    }
    let (clock, offset) = match time.find(['+', '-']) {
        Some(at) => time.split_at(at),
        None => (time, ""),
    };
    is_iso_clock(clock) && (offset.is_empty() || offset.parse::<FixedOffset>().is_ok())
}

fn is_iso_clock(clock: &str) -> bool {
    if clock.len() == 2 {
        return NaiveTime::parse_from_str(&format!("{clock}:00"), "%H:%M").is_ok();
    }
    CLOCK_FORMATS
        .iter()
        .any(|format| NaiveTime::parse_from_str(clock, format).is_ok())
}

/// Checks shared by received channel info and mask channel info: the operating
/// class and every CFI are finite, and the power list pairs up with the CFI list.
pub(crate) fn check_channel_lists(
    global_operating_class: f64,
    channel_cfi: &[f64],
    power_count: usize,
    report: &mut Report,
) -> bool {
    report.section(|report| {
        report.require(channel_cfi.len() == power_count, || {
            format!(
                "Length of channelCfi list ({}) does not match length of maxEirp list ({power_count})",
                channel_cfi.len()
            )
        });
        report.require(channel_cfi.iter().all(|cfi| cfi.is_finite()), || {
            format!("channelCfi ({channel_cfi:?}) must be a list of finite numeric values")
        });
        report.require(global_operating_class.is_finite(), || {
            format!(
                "globalOperatingClass ({global_operating_class}) must be a single finite numeric value"
            )
        });
    })
}

/// Rules for available spectrum inquiry responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseValidator {
    settings: ValidatorSettings,
}

impl ResponseValidator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    pub fn validate_message(&self, message: &ResponseMessage) -> Report {
        let mut report = Report::new();
        self.check_message(message, &mut report);
        report
    }

    pub fn validate_message_json(
        &self,
        raw: &Value,
    ) -> Result<Checked<ResponseMessage>, ConversionError> {
        validate_json(raw, |message, report| {
            self.check_message(message, report);
        })
    }

    pub fn validate_response(&self, response: &InquiryResponse) -> Report {
        let mut report = Report::new();
        self.check_inquiry_response(response, &mut report);
        report
    }

    pub fn check_message(&self, message: &ResponseMessage, report: &mut Report) -> bool {
        with_common(message, report, |message, report| {
            check_version(&message.version, &self.settings, report);
            let responses = &message.available_spectrum_inquiry_responses;
            report.require(!responses.is_empty(), || {
                "availableSpectrumInquiryResponses must contain at least one response".to_owned()
            });
            for response in responses {
                self.check_inquiry_response(response, report);
            }
            check_unique_ids(
                responses.iter().map(|r| r.request_id.as_str()),
                "Response message",
                report,
            );
            check_vendor_extensions(message.vendor_extensions.as_deref(), report);
        })
    }

    pub fn check_inquiry_response(&self, response: &InquiryResponse, report: &mut Report) -> bool {
        with_common(response, report, |response, report| {
            self.check_response(&response.response, report);

            let availability = [
                ("availableFrequencyInfo", response.available_frequency_info.is_some()),
                ("availableChannelInfo", response.available_channel_info.is_some()),
                ("availabilityExpireTime", response.availability_expire_time.is_some()),
            ];
            if response.code().is_success() {
                report.require(response.availability_expire_time.is_some(), || {
                    "ResponseCode is SUCCESS but availabilityExpireTime is not provided".to_owned()
                });
                report.require(
                    response.available_frequency_info.is_some()
                        || response.available_channel_info.is_some(),
                    || "ResponseCode is SUCCESS but no availability information is provided".to_owned(),
                );
            } else {
                for (field, present) in availability {
                    report.require(!present, || {
                        format!("ResponseCode is not SUCCESS but {field} is provided")
                    });
                }
            }

            for info in response.available_frequency_info.iter().flatten() {
                self.check_frequency_info(info, report);
            }
            for info in response.available_channel_info.iter().flatten() {
                self.check_channel_info(info, report);
            }
            if let Some(expire_time) = &response.availability_expire_time {
                report.require(is_utc_timestamp(expire_time), || {
                    format!("availabilityExpireTime has invalid format: {expire_time}")
                });
            }
            report.advise(self.settings.knows_ruleset(&response.ruleset_id), || {
                format!("Unknown rulesetId in response: {}", response.ruleset_id)
            });
            check_vendor_extensions(response.vendor_extensions.as_deref(), report);
        })
    }

    /// The response code decides which supplemental info field may be populated.
    pub fn check_response(&self, response: &Response, report: &mut Report) -> bool {
        with_common(response, report, |response, report| {
            let Some(info) = &response.supplemental_info else {
                return;
            };
            self.check_supplemental_info(info, report);

            let code = response.response_code;
            let permitted = match code {
                ResponseCode::MissingParam => Some("missingParams"),
                ResponseCode::InvalidValue => Some("invalidParams"),
                ResponseCode::UnexpectedParam => Some("unexpectedParams"),
                ResponseCode::Vendor(_) => {
                    report.warning(format!(
                        "Response code {code} is not defined by the protocol; \
                         supplementalInfo not checked against it"
                    ));
                    return;
                }
                ResponseCode::GeneralFailure
                | ResponseCode::Success
                | ResponseCode::VersionNotSupported
                | ResponseCode::DeviceDisallowed
                | ResponseCode::UnsupportedSpectrum
                | ResponseCode::UnsupportedBasis => None,
            };
            for (field, _) in info.populated() {
                report.require(permitted == Some(field), || {
                    format!("Response supplementalInfo contains {field} field but response code is {code}")
                });
            }
        })
    }

    pub fn check_supplemental_info(&self, info: &SupplementalInfo, report: &mut Report) -> bool {
        with_common(info, report, |info, report| {
            let populated = info.populated();
            report.require(populated.len() <= 1, || {
                format!(
                    "SupplementalInfo has {} non-empty fields; should be 0 or 1",
                    populated.len()
                )
            });
            for (field, values) in populated {
                report.require(!values.is_empty(), || {
                    format!("SupplementalInfo contains an empty list for {field}")
                });
            }
        })
    }

    pub fn check_frequency_info(&self, info: &AvailableFrequencyInfo, report: &mut Report) -> bool {
        with_common(info, report, |info, report| {
            check_frequency_range(&info.frequency_range, report);
            report.require(info.max_psd.is_finite(), || {
                format!("maxPsd ({}) must be a single finite numeric value", info.max_psd)
            });
        })
    }

    pub fn check_channel_info(&self, info: &AvailableChannelInfo, report: &mut Report) -> bool {
        with_common(info, report, |info, report| {
            check_channel_lists(
                info.global_operating_class,
                &info.channel_cfi,
                info.max_eirp.len(),
                report,
            );
            report.require(info.max_eirp.iter().all(|eirp| eirp.is_finite()), || {
                format!("maxEirp ({:?}) must be a list of finite numeric values", info.max_eirp)
            });
        })
    }
}
