//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use serde_json::Value;

use super::response::check_channel_lists;
use super::{check_frequency_range, check_unique_ids, check_vendor_extensions, check_version};
use crate::errors::ConversionError;
use crate::model::{
    ExpectedAvailableChannelInfo, ExpectedAvailableFrequencyInfo, ExpectedPowerRange,
    ExpectedResponse, ExpectedResponseMessage, ResponseCode,
};
use crate::settings::ValidatorSettings;
use crate::validation::{validate_json, with_common, Checked, Report};

/// Rules for expected response masks.
#[derive(Debug, Clone, Default)]
pub struct MaskValidator {
    settings: ValidatorSettings,
}

impl MaskValidator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    pub fn validate_message(&self, message: &ExpectedResponseMessage) -> Report {
        let mut report = Report::new();
        self.check_message(message, &mut report);
        report
    }

    pub fn validate_message_json(
        &self,
        raw: &Value,
    ) -> Result<Checked<ExpectedResponseMessage>, ConversionError> {
        validate_json(raw, |message, report| {
            self.check_message(message, report);
        })
    }

    pub fn validate_expected(&self, expected: &ExpectedResponse) -> Report {
        let mut report = Report::new();
        self.check_expected_response(expected, &mut report);
        report
    }

    pub fn check_message(&self, message: &ExpectedResponseMessage, report: &mut Report) -> bool {
        with_common(message, report, |message, report| {
            check_version(&message.version, &self.settings, report);
            let expected = &message.expected_spectrum_inquiry_responses;
            report.require(!expected.is_empty(), || {
                "expectedSpectrumInquiryResponses must contain at least one expected response"
                    .to_owned()
            });
            for mask in expected {
                self.check_expected_response(mask, report);
            }
            check_unique_ids(
                expected.iter().map(|e| e.request_id.as_str()),
                "Response mask",
                report,
            );
            check_vendor_extensions(message.vendor_extensions.as_deref(), report);
        })
    }

    pub fn check_expected_response(&self, expected: &ExpectedResponse, report: &mut Report) -> bool {
        with_common(expected, report, |expected, report| {
            check_vendor_extensions(expected.vendor_extensions.as_deref(), report);

            let codes = expected.expected_response_codes();
            report.require(!codes.is_empty(), || {
                "expectedResponseCodes must list at least one response code".to_owned()
            });
            if codes.contains(&ResponseCode::Success) {
                report.require(codes.len() == 1, || {
                    "Cannot expect SUCCESS and other response codes in the same mask".to_owned()
                });
                report.require(
                    expected.expected_frequency_info.is_some()
                        || expected.expected_channel_info.is_some(),
                    || "Expected response is SUCCESS but no availability info is provided".to_owned(),
                );
            } else if !codes.is_empty() {
                let present = [
                    ("expectedFrequencyInfo", expected.expected_frequency_info.is_some()),
                    ("expectedChannelInfo", expected.expected_channel_info.is_some()),
                ];
                for (field, is_present) in present {
                    report.require(!is_present, || {
                        format!("SUCCESS code is not expected, but mask expects data in {field}")
                    });
                }
            }

            for code in expected.disallowed_response_codes() {
                report.require(!codes.contains(code), || {
                    format!("Response code {code} is both expected and disallowed")
                });
            }

            if let Some(infos) = &expected.expected_channel_info {
                for info in infos {
                    self.check_channel_info(info, report);
                }
                for (idx, info) in infos.iter().enumerate() {
                    let goc = info.global_operating_class;
                    let earlier = infos[..idx]
                        .iter()
                        .any(|other| other.global_operating_class == goc);
                    if earlier {
                        continue;
                    }
                    let count = infos[idx..]
                        .iter()
                        .filter(|other| other.global_operating_class == goc)
                        .count();
                    report.require(count == 1, || {
                        format!(
                            "Response mask should have no more than one occurrence of any given \
                             globalOperatingClass value; {goc} appears {count} times"
                        )
                    });
                }
            }

            if let Some(infos) = &expected.expected_frequency_info {
                for info in infos {
                    self.check_frequency_info(info, report);
                }
                for (idx, first) in infos.iter().enumerate() {
                    for second in &infos[idx + 1..] {
                        report.require(!first.frequency_range.overlaps(&second.frequency_range), || {
                            format!(
                                "Frequency info ({}) overlaps range ({})",
                                first.frequency_range, second.frequency_range
                            )
                        });
                    }
                }
            }
        })
    }

    pub fn check_channel_info(
        &self,
        info: &ExpectedAvailableChannelInfo,
        report: &mut Report,
    ) -> bool {
        with_common(info, report, |info, report| {
            check_channel_lists(
                info.global_operating_class,
                &info.channel_cfi,
                info.max_eirp.len(),
                report,
            );
            for range in &info.max_eirp {
                self.check_power_range(range, report);
            }
            let has_duplicates = info
                .channel_cfi
                .iter()
                .enumerate()
                .any(|(idx, cfi)| info.channel_cfi[idx + 1..].contains(cfi));
            report.require(!has_duplicates, || {
                format!(
                    "ExpectedAvailableChannelInfo contains duplicate channelCfis: {:?}",
                    info.channel_cfi
                )
            });
        })
    }

    pub fn check_frequency_info(
        &self,
        info: &ExpectedAvailableFrequencyInfo,
        report: &mut Report,
    ) -> bool {
        with_common(info, report, |info, report| {
            check_frequency_range(&info.frequency_range, report);
            self.check_power_range(&info.max_psd, report);
        })
    }

    /// `lowerBound <= nominalValue <= upperBound`, skipping absent bounds, and no NaN anywhere.
    pub fn check_power_range(&self, range: &ExpectedPowerRange, report: &mut Report) -> bool {
        with_common(range, report, |range, report| {
            let fields = [
                ("upperBound", Some(range.upper_bound)),
                ("nominalValue", range.nominal_value),
                ("lowerBound", range.lower_bound),
            ];
            for (field, value) in fields {
                report.require(!value.is_some_and(f64::is_nan), || {
                    format!("Value for {field} cannot be NaN")
                });
            }

            let upper = range.upper_bound;
            if let Some(lower) = range.lower_bound.filter(|lower| *lower > upper) {
                report.error(format!(
                    "Lower bound of power range ({lower}) must be less than or equal to upper bound ({upper})"
                ));
            }
            if let Some(nominal) = range.nominal_value.filter(|nominal| *nominal > upper) {
                report.error(format!(
                    "Nominal value of power range ({nominal}) must be less than or equal to upper bound ({upper})"
                ));
            }
            if let (Some(lower), Some(nominal)) = (range.lower_bound, range.nominal_value) {
                if lower > nominal {
                    report.error(format!(
                        "Lower bound of power range ({lower}) must be less than or equal to nominal value ({nominal})"
                    ));
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FrequencyRange;
    use serde_json::json;

    fn success_mask() -> ExpectedResponse {
        ExpectedResponse::new("A", "US_47_CFR_PART_15_SUBPART_E", vec![ResponseCode::Success])
            .with_channel_info(vec![ExpectedAvailableChannelInfo {
                global_operating_class: 131.0,
                channel_cfi: vec![1.0, 5.0],
                max_eirp: vec![ExpectedPowerRange::between(20.0, 30.0); 2],
            }])
    }

    fn frequency_info(low: f64, high: f64) -> ExpectedAvailableFrequencyInfo {
        ExpectedAvailableFrequencyInfo {
            frequency_range: FrequencyRange::new(low, high),
            max_psd: ExpectedPowerRange::at_most(23.0),
        }
    }

    #[test]
    fn well_formed_mask_is_valid() {
        let report = MaskValidator::default().validate_expected(&success_mask());
        assert!(report.is_valid(), "{report:?}");
    }

    #[test]
    fn power_range_ordering_and_nan() {
        let validator = MaskValidator::default();
        let mut report = Report::detached();
        let ok = ExpectedPowerRange {
            upper_bound: 30.0,
            nominal_value: Some(25.0),
            lower_bound: Some(20.0),
        };
        assert!(validator.check_power_range(&ok, &mut report));

        let inverted = ExpectedPowerRange {
            upper_bound: 20.0,
            nominal_value: Some(25.0),
            lower_bound: Some(30.0),
        };
        assert!(!validator.check_power_range(&inverted, &mut report));
        assert_eq!(report.failure_count(), 3);

        let mut report = Report::detached();
        let nan = ExpectedPowerRange {
            upper_bound: 30.0,
            nominal_value: Some(f64::NAN),
            lower_bound: None,
        };
        assert!(!validator.check_power_range(&nan, &mut report));
        assert!(report
            .failures()
            .any(|v| v.message == "Value for nominalValue cannot be NaN"));
    }

    #[test]
    fn success_cannot_be_combined_with_other_codes() {
        let mask = ExpectedResponse::new(
            "A",
            "US_47_CFR_PART_15_SUBPART_E",
            vec![ResponseCode::Success, ResponseCode::GeneralFailure],
        );
        let report = MaskValidator::default().validate_expected(&mask);
        let messages: Vec<_> = report.failures().map(|v| v.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("Cannot expect SUCCESS")));
        assert!(messages.iter().any(|m| m.contains("no availability info")));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn error_mask_must_not_expect_availability() {
        let mask = ExpectedResponse::new(
            "A",
            "US_47_CFR_PART_15_SUBPART_E",
            vec![ResponseCode::InvalidValue],
        )
        .with_frequency_info(vec![frequency_info(5925.0, 6425.0)]);
        let report = MaskValidator::default().validate_expected(&mask);
        assert_eq!(report.failure_count(), 1);
        assert!(report.violations()[0].message.contains("expectedFrequencyInfo"));
    }

    #[test]
    fn overlapping_frequency_info_fails_even_without_channels() {
        let mask = ExpectedResponse::new("A", "r", vec![ResponseCode::Success])
            .with_frequency_info(vec![
                frequency_info(5925.0, 6100.0),
                frequency_info(6100.0, 6200.0),
                frequency_info(6150.0, 6425.0),
            ]);
        let report = MaskValidator::default().validate_expected(&mask);
        assert_eq!(report.failure_count(), 1);
        assert!(report.violations()[0].message.contains("overlaps"));
    }

    #[test]
    fn duplicate_operating_classes_and_cfis() {
        let mut mask = success_mask();
        let mut infos = mask.expected_channel_info.take().unwrap();
        infos[0].channel_cfi = vec![1.0, 1.0];
        infos.push(infos[0].clone());
        let mask = mask.with_channel_info(infos);

        let report = MaskValidator::default().validate_expected(&mask);
        let messages: Vec<_> = report.failures().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages.iter().filter(|m| m.contains("duplicate channelCfis")).count(),
            2
        );
        assert!(messages.iter().any(|m| m.contains("131 appears 2 times")));
    }

    #[test]
    fn explicit_disallowed_codes_must_not_overlap_expected() {
        let mask = ExpectedResponse::new("A", "r", vec![ResponseCode::GeneralFailure])
            .with_disallowed_codes(vec![ResponseCode::GeneralFailure, ResponseCode::Success]);
        let report = MaskValidator::default().validate_expected(&mask);
        assert_eq!(report.failure_count(), 1);
        assert!(report.violations()[0].message.contains("GENERAL_FAILURE (-1)"));
    }

    #[test]
    fn message_requires_unique_request_ids() {
        let raw = json!({
            "version": "1.4",
            "expectedSpectrumInquiryResponses": [
                {"requestId": "A", "rulesetId": "r", "expectedResponseCodes": [-1]},
                {"requestId": "A", "rulesetId": "r", "expectedResponseCodes": [101]}
            ]
        });
        let checked = MaskValidator::default().validate_message_json(&raw).unwrap();
        assert!(!checked.is_valid());
        assert_eq!(checked.report.failure_count(), 1);
    }

    #[test]
    fn validation_is_idempotent() {
        let mask = ExpectedResponse::new(
            "A",
            "US_47_CFR_PART_15_SUBPART_E",
            vec![ResponseCode::Success, ResponseCode::InvalidValue],
        )
        .with_frequency_info(vec![frequency_info(5925.0, 6100.0), frequency_info(6000.0, 6200.0)]);
        let message = ExpectedResponseMessage {
            version: "1.4".into(),
            expected_spectrum_inquiry_responses: vec![mask.clone(), success_mask()],
            vendor_extensions: None,
        };
        let validator = MaskValidator::default();

        let first = validator.validate_expected(&mask);
        let second = validator.validate_expected(&mask);
        assert!(first.failure_count() >= 2);
        assert_eq!(first.violations(), second.violations());

        let first = validator.validate_message(&message);
        let second = validator.validate_message(&message);
        assert!(!first.is_valid());
        assert_eq!(first.violations(), second.violations());
    }
}
