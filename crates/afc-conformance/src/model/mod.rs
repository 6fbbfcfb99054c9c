//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Typed entities of the spectrum inquiry exchange. Field names follow the wire
//! format (camelCase) and absent optional fields are dropped on serialization.

pub mod common;
pub mod expected;
pub mod request;
pub mod response;

pub use common::{FrequencyRange, VendorExtension};
pub use expected::{
    ExpectedAvailableChannelInfo, ExpectedAvailableFrequencyInfo, ExpectedPowerRange,
    ExpectedResponse, ExpectedResponseMessage,
};
pub use request::{
    CertificationId, Channels, DeviceDescriptor, Elevation, Ellipse, InquiryBasis,
    InquiryRequest, LinearPolygon, Location, LocationShape, Point, RadialPolygon,
    RequestMessage, Vector,
};
pub use response::{
    AvailableChannelInfo, AvailableFrequencyInfo, InquiryResponse, Response, ResponseCode,
    ResponseMessage, SupplementalInfo,
};
