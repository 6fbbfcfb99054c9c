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

use super::{
    check_frequency_range, check_non_empty, check_unique_ids, check_vendor_extensions,
    check_version,
};
use crate::errors::ConversionError;
use crate::geometry;
use crate::model::{
    CertificationId, Channels, DeviceDescriptor, Elevation, Ellipse, InquiryBasis,
    InquiryRequest, LinearPolygon, Location, LocationShape, Point, RadialPolygon,
    RequestMessage, Vector,
};
use crate::settings::ValidatorSettings;
use crate::validation::{validate_json, with_common, Checked, Report};

/// Rules for available spectrum inquiry requests.
#[derive(Debug, Clone, Default)]
pub struct RequestValidator {
    settings: ValidatorSettings,
}

impl RequestValidator {
    pub fn new(settings: ValidatorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ValidatorSettings {
        &self.settings
    }

    pub fn validate_message(&self, message: &RequestMessage) -> Report {
        let mut report = Report::new();
        self.check_message(message, &mut report);
        report
    }

    pub fn validate_message_json(
        &self,
        raw: &Value,
    ) -> Result<Checked<RequestMessage>, ConversionError> {
        validate_json(raw, |message, report| {
            self.check_message(message, report);
        })
    }

    pub fn check_message(&self, message: &RequestMessage, report: &mut Report) -> bool {
        with_common(message, report, |message, report| {
            check_version(&message.version, &self.settings, report);
            let requests = &message.available_spectrum_inquiry_requests;
            report.require(!requests.is_empty(), || {
                "availableSpectrumInquiryRequests must contain at least one request".to_owned()
            });
            for request in requests {
                self.check_request(request, report);
            }
            check_unique_ids(
                requests.iter().map(|r| r.request_id.as_str()),
                "Request message",
                report,
            );
            check_vendor_extensions(message.vendor_extensions.as_deref(), report);
        })
    }

    pub fn check_request(&self, request: &InquiryRequest, report: &mut Report) -> bool {
        with_common(request, report, |request, report| {
            self.check_device_descriptor(&request.device_descriptor, report);
            self.check_location(&request.location, report);

            if let Some(ranges) = &request.inquired_frequency_range {
                check_non_empty(ranges, "inquiredFrequencyRange", report);
                for range in ranges {
                    check_frequency_range(range, report);
                }
            }
            if let Some(channels) = &request.inquired_channels {
                check_non_empty(channels, "inquiredChannels", report);
                for entry in channels {
                    self.check_channels(entry, report);
                }
            }

            let basis = request.inquiry_basis();
            report.require(basis.is_some(), || {
                format!(
                    "Request {}: neither frequency- nor channel-based inquiry is present",
                    request.request_id
                )
            });

            if let Some(power) = request.min_desired_power {
                report.require(power.is_finite(), || {
                    format!("minDesiredPower ({power}) must be a finite number")
                });
                let channel_inquiry =
                    matches!(basis, Some(InquiryBasis::Channels(_) | InquiryBasis::Both(..)));
                report.advise(channel_inquiry, || {
                    "minDesiredPower is only meaningful with a channel-based inquiry".to_owned()
                });
            }

            check_vendor_extensions(request.vendor_extensions.as_deref(), report);
        })
    }

    pub fn check_device_descriptor(&self, device: &DeviceDescriptor, report: &mut Report) -> bool {
        with_common(device, report, |device, report| {
            report.require(!device.serial_number.is_empty(), || {
                "serialNumber must not be empty".to_owned()
            });
            report.require(!device.certification_id.is_empty(), || {
                "certificationId must list at least one certification".to_owned()
            });
            for certification in &device.certification_id {
                self.check_certification_id(certification, report);
            }
            for ruleset in device.ruleset_ids.iter().flatten() {
                report.advise(self.settings.knows_ruleset(ruleset), || {
                    format!("Unknown rulesetId in rulesetIds: {ruleset}")
                });
            }
        })
    }

    pub fn check_certification_id(&self, id: &CertificationId, report: &mut Report) -> bool {
        with_common(id, report, |id, report| {
            report.advise(self.settings.knows_ruleset(&id.ruleset_id), || {
                format!(
                    "Unknown rulesetId ({}) for certification {}",
                    id.ruleset_id, id.id
                )
            });
            report.require(!id.id.is_empty(), || "certification id must not be empty".to_owned());
        })
    }

    pub fn check_channels(&self, channels: &Channels, report: &mut Report) -> bool {
        with_common(channels, report, |channels, report| {
            report.require(channels.global_operating_class.is_finite(), || {
                format!(
                    "globalOperatingClass ({}) must be a finite number",
                    channels.global_operating_class
                )
            });
            if let Some(cfis) = &channels.channel_cfi {
                report.require(cfis.iter().all(|cfi| cfi.is_finite()), || {
                    format!("channelCfi ({cfis:?}) must be a list of finite numbers")
                });
            }
        })
    }

    pub fn check_location(&self, location: &Location, report: &mut Report) -> bool {
        with_common(location, report, |location, report| {
            self.check_elevation(&location.elevation, report);
            match &location.shape {
                LocationShape::Ellipse(ellipse) => {
                    self.check_ellipse(ellipse, report);
                }
                LocationShape::LinearPolygon(polygon) => {
                    self.check_linear_polygon(polygon, report);
                }
                LocationShape::RadialPolygon(polygon) => {
                    self.check_radial_polygon(polygon, report);
                }
            }
            if let Some(indoor) = location.indoor_deployment {
                report.require(Location::INDOOR_DEPLOYMENTS.contains(&indoor), || {
                    format!("indoorDeployment ({indoor}) must be 0 (unknown), 1 (indoor) or 2 (outdoor)")
                });
            }
        })
    }

    pub fn check_elevation(&self, elevation: &Elevation, report: &mut Report) -> bool {
        with_common(elevation, report, |elevation, report| {
            report.require(
                Elevation::HEIGHT_TYPES.contains(&elevation.height_type.as_str()),
                || format!("Invalid heightType: {}", elevation.height_type),
            );
            report.require(elevation.vertical_uncertainty >= 0, || {
                format!(
                    "verticalUncertainty ({}) must not be negative",
                    elevation.vertical_uncertainty
                )
            });
        })
    }

    pub fn check_ellipse(&self, ellipse: &Ellipse, report: &mut Report) -> bool {
        with_common(ellipse, report, |ellipse, report| {
            self.check_point(&ellipse.center, report);
            report.require(ellipse.major_axis >= 0, || {
                format!("majorAxis must not be negative: {}", ellipse.major_axis)
            });
            report.require(ellipse.minor_axis >= 0, || {
                format!("minorAxis must not be negative: {}", ellipse.minor_axis)
            });
            report.require(ellipse.minor_axis <= ellipse.major_axis, || {
                format!(
                    "minorAxis ({}) must not exceed majorAxis ({})",
                    ellipse.minor_axis, ellipse.major_axis
                )
            });
            report.require((0.0..=180.0).contains(&ellipse.orientation), || {
                format!("orientation value is outside of 0-180: {}", ellipse.orientation)
            });
        })
    }

    pub fn check_point(&self, point: &Point, report: &mut Report) -> bool {
        with_common(point, report, |point, report| {
            report.require((-180.0..=180.0).contains(&point.longitude), || {
                format!("longitude is outside of -180..180: {}", point.longitude)
            });
            report.require((-90.0..=90.0).contains(&point.latitude), || {
                format!("latitude is outside of -90..90: {}", point.latitude)
            });
        })
    }

    pub fn check_vector(&self, vector: &Vector, report: &mut Report) -> bool {
        with_common(vector, report, |vector, report| {
            report.require(vector.length.is_finite() && vector.length >= 0.0, || {
                format!("vector length must be a non-negative distance: {}", vector.length)
            });
            report.require((0.0..=360.0).contains(&vector.angle), || {
                format!("vector angle is outside of 0-360: {}", vector.angle)
            });
        })
    }

    /// Vertices are checked one by one; polygon geometry only once they are all usable.
    pub fn check_linear_polygon(&self, polygon: &LinearPolygon, report: &mut Report) -> bool {
        with_common(polygon, report, |polygon, report| {
            let vertices_ok = report.section(|report| {
                for vertex in &polygon.outer_boundary {
                    self.check_point(vertex, report);
                }
            });
            if vertices_ok {
                geometry::validate_polygon(&polygon.outer_boundary, &self.settings.polygon, report);
            }
        })
    }

    pub fn check_radial_polygon(&self, polygon: &RadialPolygon, report: &mut Report) -> bool {
        with_common(polygon, report, |polygon, report| {
            let parts_ok = report.section(|report| {
                self.check_point(&polygon.center, report);
                for vector in &polygon.outer_boundary {
                    self.check_vector(vector, report);
                }
            });
            if parts_ok {
                geometry::validate_polygon(&polygon.vertices(), &self.settings.polygon, report);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Severity;
    use serde_json::json;

    fn request_json() -> Value {
        json!({
            "version": "1.4",
            "availableSpectrumInquiryRequests": [{
                "requestId": "REQ-FSP1",
                "deviceDescriptor": {
                    "serialNumber": "SN-0001",
                    "certificationId": [{"rulesetId": "US_47_CFR_PART_15_SUBPART_E", "id": "FCCID-1"}]
                },
                "location": {
                    "elevation": {"height": 3.0, "heightType": "AGL", "verticalUncertainty": 2},
                    "ellipse": {
                        "center": {"longitude": -97.0, "latitude": 32.0},
                        "majorAxis": 100, "minorAxis": 50, "orientation": 45
                    },
                    "indoorDeployment": 2
                },
                "inquiredFrequencyRange": [{"lowFrequency": 5925, "highFrequency": 6425}],
                "inquiredChannels": [{"globalOperatingClass": 133, "channelCfi": [7, 23]}],
                "minDesiredPower": 18
            }]
        })
    }

    #[test]
    fn well_formed_request_is_valid() {
        let checked = RequestValidator::default()
            .validate_message_json(&request_json())
            .unwrap();
        assert!(checked.is_valid(), "{:?}", checked.report);
        assert!(checked.report.is_empty());
    }

    #[test]
    fn reports_every_field_problem_in_one_pass() {
        let mut raw = request_json();
        let request = &mut raw["availableSpectrumInquiryRequests"][0];
        request["location"]["elevation"]["heightType"] = json!("XYZ");
        request["location"]["ellipse"]["orientation"] = json!(270);
        request["location"]["ellipse"]["minorAxis"] = json!(500);
        request["location"]["indoorDeployment"] = json!(7);
        request["inquiredFrequencyRange"] = json!([]);
        request["inquiredChannels"] = json!([]);

        let checked = RequestValidator::default().validate_message_json(&raw).unwrap();
        assert!(!checked.is_valid());
        let messages: Vec<_> = checked.report.failures().map(|v| v.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("Invalid heightType")));
        assert!(messages.iter().any(|m| m.contains("orientation value")));
        assert!(messages.iter().any(|m| m.contains("must not exceed majorAxis")));
        assert!(messages.iter().any(|m| m.contains("indoorDeployment")));
        assert!(messages.iter().any(|m| m.contains("inquiredFrequencyRange is present")));
        assert!(messages.iter().any(|m| m.contains("inquiredChannels is present")));
        assert!(messages.iter().any(|m| m.contains("neither frequency- nor channel-based")));
        assert_eq!(messages.len(), 7);
    }

    #[test]
    fn unknown_ruleset_only_warns() {
        let mut raw = request_json();
        raw["availableSpectrumInquiryRequests"][0]["deviceDescriptor"]["certificationId"][0]
            ["rulesetId"] = json!("XX_RULES");
        let checked = RequestValidator::default().validate_message_json(&raw).unwrap();
        assert!(checked.is_valid());
        assert_eq!(checked.report.count(Severity::Warning), 1);
    }

    #[test]
    fn duplicate_request_ids_fail_the_message() {
        let mut raw = request_json();
        let first = raw["availableSpectrumInquiryRequests"][0].clone();
        raw["availableSpectrumInquiryRequests"]
            .as_array_mut()
            .unwrap()
            .push(first);
        let checked = RequestValidator::default().validate_message_json(&raw).unwrap();
        assert!(!checked.is_valid());
        assert_eq!(checked.report.failure_count(), 1);
    }

    #[test]
    fn min_desired_power_without_channels_warns() {
        let mut raw = request_json();
        raw["availableSpectrumInquiryRequests"][0]
            .as_object_mut()
            .unwrap()
            .remove("inquiredChannels");
        let checked = RequestValidator::default().validate_message_json(&raw).unwrap();
        assert!(checked.is_valid());
        assert!(checked
            .report
            .violations()
            .iter()
            .any(|v| v.message.contains("minDesiredPower is only meaningful")));
    }

    #[test]
    fn two_location_shapes_fail_conversion_with_shape_violation() {
        let mut raw = request_json();
        raw["availableSpectrumInquiryRequests"][0]["location"]["linearPolygon"] =
            json!({"outerBoundary": [{"longitude": 0, "latitude": 0}]});
        let err = RequestValidator::default().validate_message_json(&raw).unwrap_err();
        assert!(err
            .violations
            .iter()
            .any(|v| v.message.contains("exactly one of ellipse, linearPolygon, radialPolygon")));
    }

    #[test]
    fn self_intersecting_polygon_fails_only_in_strict_mode() {
        let mut raw = request_json();
        let location = &mut raw["availableSpectrumInquiryRequests"][0]["location"];
        location.as_object_mut().unwrap().remove("ellipse");
        location["linearPolygon"] = json!({"outerBoundary": [
            {"longitude": 0.00, "latitude": 0.00},
            {"longitude": 0.01, "latitude": 0.01},
            {"longitude": 0.01, "latitude": 0.00},
            {"longitude": 0.00, "latitude": 0.01}
        ]});

        let lenient = RequestValidator::default().validate_message_json(&raw).unwrap();
        assert!(lenient.is_valid());
        assert!(lenient
            .report
            .violations()
            .iter()
            .any(|v| v.severity == Severity::Warning && v.message.contains("intersect")));

        let strict = RequestValidator::new(ValidatorSettings::default().strict())
            .validate_message_json(&raw)
            .unwrap();
        assert!(!strict.is_valid());
    }

    #[test]
    fn radial_polygon_vectors_are_range_checked() {
        let polygon = RadialPolygon {
            center: Point::new(-97.0, 32.0),
            outer_boundary: vec![
                Vector { length: 500.0, angle: 0.0 },
                Vector { length: -1.0, angle: 400.0 },
                Vector { length: 500.0, angle: 240.0 },
            ],
        };
        let mut report = Report::detached();
        assert!(!RequestValidator::default().check_radial_polygon(&polygon, &mut report));
        assert_eq!(report.failure_count(), 2);
    }

    #[test]
    fn validation_is_idempotent() {
        let message: RequestMessage = serde_json::from_value(request_json()).unwrap();
        let validator = RequestValidator::default();
        let first = validator.validate_message(&message);
        let second = validator.validate_message(&message);
        assert_eq!(first.violations(), second.violations());
    }
}
