//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Available spectrum inquiry request entities.

use serde::{Deserialize, Serialize};

use super::common::{FrequencyRange, VendorExtension};
use crate::geometry;
use crate::validation::{Element, Entity, FieldKind, Schema};

/// Operating class plus the channel indices inquired within it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channels {
    pub global_operating_class: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_cfi: Option<Vec<f64>>,
}

impl Entity for Channels {
    const NAME: &'static str = "Channels";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("globalOperatingClass", FieldKind::number())
            .optional("channelCfi", FieldKind::list(Element::Number))
    }
}

/// Geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Point) -> f64 {
        geometry::distance(self, other)
    }

    /// Unit vector on the sphere.
    pub fn as_cartesian(&self) -> [f64; 3] {
        let lat = self.latitude.to_radians();
        let lon = self.longitude.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

impl Entity for Point {
    const NAME: &'static str = "Point";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("longitude", FieldKind::number())
            .required("latitude", FieldKind::number())
    }
}

/// Distance in meters along a bearing in degrees clockwise from true north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub length: f64,
    pub angle: f64,
}

impl Vector {
    pub fn endpoint_from(&self, origin: &Point) -> Point {
        geometry::destination(origin, self.length, self.angle)
    }
}

impl Entity for Vector {
    const NAME: &'static str = "Vector";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("length", FieldKind::number())
            .required("angle", FieldKind::number())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elevation {
    pub height: f64,
    pub height_type: String,
    pub vertical_uncertainty: i64,
}

impl Elevation {
    pub const HEIGHT_TYPES: [&'static str; 2] = ["AGL", "AMSL"];
}

impl Entity for Elevation {
    const NAME: &'static str = "Elevation";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("height", FieldKind::number())
            .required("heightType", FieldKind::string())
            .required("verticalUncertainty", FieldKind::integer())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ellipse {
    pub center: Point,
    pub major_axis: i64,
    pub minor_axis: i64,
    pub orientation: f64,
}

impl Entity for Ellipse {
    const NAME: &'static str = "Ellipse";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("center", FieldKind::object::<Point>())
            .required("majorAxis", FieldKind::integer())
            .required("minorAxis", FieldKind::integer())
            .required("orientation", FieldKind::number())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearPolygon {
    pub outer_boundary: Vec<Point>,
}

impl From<&RadialPolygon> for LinearPolygon {
    fn from(radial: &RadialPolygon) -> Self {
        Self {
            outer_boundary: radial.vertices(),
        }
    }
}

impl Entity for LinearPolygon {
    const NAME: &'static str = "LinearPolygon";

    fn schema() -> Schema {
        Schema::new(Self::NAME).required("outerBoundary", FieldKind::list_of::<Point>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadialPolygon {
    pub center: Point,
    pub outer_boundary: Vec<Vector>,
}

impl RadialPolygon {
    /// Boundary vertices reached by applying each vector to the center.
    pub fn vertices(&self) -> Vec<Point> {
        self.outer_boundary
            .iter()
            .map(|vector| vector.endpoint_from(&self.center))
            .collect()
    }

    pub fn to_linear(&self) -> LinearPolygon {
        LinearPolygon::from(self)
    }
}

impl Entity for RadialPolygon {
    const NAME: &'static str = "RadialPolygon";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("center", FieldKind::object::<Point>())
            .required("outerBoundary", FieldKind::list_of::<Vector>())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationShape {
    Ellipse(Ellipse),
    LinearPolygon(LinearPolygon),
    RadialPolygon(RadialPolygon),
}

/// Device location with exactly one uncertainty-area shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LocationWire", into = "LocationWire")]
pub struct Location {
    pub elevation: Elevation,
    pub shape: LocationShape,
    pub indoor_deployment: Option<i64>,
}

impl Location {
    pub const INDOOR_DEPLOYMENTS: [i64; 3] = [0, 1, 2];
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationWire {
    elevation: Elevation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ellipse: Option<Ellipse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    linear_polygon: Option<LinearPolygon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radial_polygon: Option<RadialPolygon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    indoor_deployment: Option<i64>,
}

impl TryFrom<LocationWire> for Location {
    type Error = String;

    fn try_from(wire: LocationWire) -> Result<Self, Self::Error> {
        let shape = match (wire.ellipse, wire.linear_polygon, wire.radial_polygon) {
            (Some(ellipse), None, None) => LocationShape::Ellipse(ellipse),
            (None, Some(polygon), None) => LocationShape::LinearPolygon(polygon),
            (None, None, Some(polygon)) => LocationShape::RadialPolygon(polygon),
            (ellipse, linear, radial) => {
                let found = [ellipse.is_some(), linear.is_some(), radial.is_some()]
                    .iter()
                    .filter(|present| **present)
                    .count();
                return Err(format!(
                    "location must carry exactly one of ellipse, linearPolygon or radialPolygon; found {found}"
                ));
            }
        };
        Ok(Location {
            elevation: wire.elevation,
            shape,
            indoor_deployment: wire.indoor_deployment,
        })
    }
}

impl From<Location> for LocationWire {
    fn from(location: Location) -> Self {
        let mut wire = LocationWire {
            elevation: location.elevation,
            ellipse: None,
            linear_polygon: None,
            radial_polygon: None,
            indoor_deployment: location.indoor_deployment,
        };
        match location.shape {
            LocationShape::Ellipse(ellipse) => wire.ellipse = Some(ellipse),
            LocationShape::LinearPolygon(polygon) => wire.linear_polygon = Some(polygon),
            LocationShape::RadialPolygon(polygon) => wire.radial_polygon = Some(polygon),
        }
        wire
    }
}

impl Entity for Location {
    const NAME: &'static str = "Location";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("elevation", FieldKind::object::<Elevation>())
            .optional("ellipse", FieldKind::object::<Ellipse>())
            .optional("linearPolygon", FieldKind::object::<LinearPolygon>())
            .optional("radialPolygon", FieldKind::object::<RadialPolygon>())
            .optional("indoorDeployment", FieldKind::integer())
            .exactly_one_of(&["ellipse", "linearPolygon", "radialPolygon"])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificationId {
    pub ruleset_id: String,
    pub id: String,
}

impl Entity for CertificationId {
    const NAME: &'static str = "CertificationId";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("rulesetId", FieldKind::string())
            .required("id", FieldKind::string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescriptor {
    pub serial_number: String,
    pub certification_id: Vec<CertificationId>,
    /// Superseded by per-certification ruleset ids; still accepted on input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ruleset_ids: Option<Vec<String>>,
}

impl Entity for DeviceDescriptor {
    const NAME: &'static str = "DeviceDescriptor";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("serialNumber", FieldKind::string())
            .required("certificationId", FieldKind::list_of::<CertificationId>())
            .optional("rulesetIds", FieldKind::list(Element::Str))
    }
}

/// Which availability bases a request inquires about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InquiryBasis<'a> {
    Frequency(&'a [FrequencyRange]),
    Channels(&'a [Channels]),
    Both(&'a [FrequencyRange], &'a [Channels]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryRequest {
    pub request_id: String,
    pub device_descriptor: DeviceDescriptor,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inquired_frequency_range: Option<Vec<FrequencyRange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inquired_channels: Option<Vec<Channels>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_desired_power: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl InquiryRequest {
    /// Non-empty inquiry lists, or `None` when the request asks for nothing.
    pub fn inquiry_basis(&self) -> Option<InquiryBasis<'_>> {
        let frequency = self
            .inquired_frequency_range
            .as_deref()
            .filter(|ranges| !ranges.is_empty());
        let channels = self
            .inquired_channels
            .as_deref()
            .filter(|channels| !channels.is_empty());
        match (frequency, channels) {
            (Some(f), Some(c)) => Some(InquiryBasis::Both(f, c)),
            (Some(f), None) => Some(InquiryBasis::Frequency(f)),
            (None, Some(c)) => Some(InquiryBasis::Channels(c)),
            (None, None) => None,
        }
    }
}

impl Entity for InquiryRequest {
    const NAME: &'static str = "InquiryRequest";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("requestId", FieldKind::string())
            .required("deviceDescriptor", FieldKind::object::<DeviceDescriptor>())
            .required("location", FieldKind::object::<Location>())
            .optional("inquiredFrequencyRange", FieldKind::list_of::<FrequencyRange>())
            .optional("inquiredChannels", FieldKind::list_of::<Channels>())
            .optional("minDesiredPower", FieldKind::number())
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMessage {
    pub version: String,
    pub available_spectrum_inquiry_requests: Vec<InquiryRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_extensions: Option<Vec<VendorExtension>>,
}

impl Entity for RequestMessage {
    const NAME: &'static str = "RequestMessage";

    fn schema() -> Schema {
        Schema::new(Self::NAME)
            .required("version", FieldKind::string())
            .required(
                "availableSpectrumInquiryRequests",
                FieldKind::list_of::<InquiryRequest>(),
            )
            .optional("vendorExtensions", FieldKind::list_of::<VendorExtension>())
    }
}
