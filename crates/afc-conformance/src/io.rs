//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde_json::Value;
use tracing::debug;

use crate::{
    errors::{HarnessError, Result},
    model::{ExpectedResponseMessage, RequestMessage, ResponseMessage},
    validation::{parse_entity, Entity},
};

/// Reads a JSON or YAML document as an untyped value. Text opening with `{` is JSON.
pub fn load_value_from_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = data.len(), "loaded message file");
    parse_value(&data)
}

pub fn parse_value(data: &str) -> Result<Value> {
    let value = if data.trim_start().starts_with('{') {
        serde_json::from_str(data)?
    } else {
        serde_yaml::from_str(data).map_err(HarnessError::YamlSerializationFailed)?
    };
    Ok(value)
}

/// Loads a file and converts it into `T`.
pub fn load_entity_from_file<T: Entity>(path: impl AsRef<Path>) -> Result<T> {
    let raw = load_value_from_file(path)?;
    Ok(parse_entity(&raw)?)
}

pub fn load_request_message(path: impl AsRef<Path>) -> Result<RequestMessage> {
    load_entity_from_file(path)
}

pub fn load_response_message(path: impl AsRef<Path>) -> Result<ResponseMessage> {
    load_entity_from_file(path)
}

pub fn load_mask_message(path: impl AsRef<Path>) -> Result<ExpectedResponseMessage> {
    load_entity_from_file(path)
}
