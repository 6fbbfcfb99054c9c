//! ---
//! afc_section: "08-conformance-engine"
//! afc_subsection: "module"
//! afc_type: "source"
//! afc_scope: "code"
//! afc_description: "Validation and response-mask reconciliation for AFC conformance testing."
//! afc_version: "v0.0.0-prealpha"
//! afc_owner: "tbd"
//! ---
//! Generic validation framework.
//!
//! Each entity declares a [`Schema`] describing its wire fields. Untyped input is
//! checked against the schema (deep, every nested object) before conversion, and
//! typed entities are re-checked shallowly by [`with_common`] before their
//! type-specific rule runs. Nothing short-circuits: all findings land in the
//! [`Report`].

pub mod report;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::errors::ConversionError;

pub use report::{Report, Severity, Violation};

/// Value type accepted by a single field or by each element of a list field.
#[derive(Debug, Clone, Copy)]
pub enum Element {
    Str,
    Integer,
    Number,
    Any,
    Object(fn() -> Schema),
}

impl Element {
    fn describe(&self) -> String {
        match self {
            Element::Str => "string".to_owned(),
            Element::Integer => "integer".to_owned(),
            Element::Number => "number".to_owned(),
            Element::Any => "any".to_owned(),
            Element::Object(schema) => schema().entity.to_owned(),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Element::Str => value.is_string(),
            Element::Integer => value.is_i64() || value.is_u64(),
            Element::Number => value.is_number(),
            Element::Any => true,
            Element::Object(_) => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Single(Element),
    List(Element),
}

impl FieldKind {
    pub fn string() -> Self {
        FieldKind::Single(Element::Str)
    }

    pub fn integer() -> Self {
        FieldKind::Single(Element::Integer)
    }

    pub fn number() -> Self {
        FieldKind::Single(Element::Number)
    }

    pub fn any() -> Self {
        FieldKind::Single(Element::Any)
    }

    pub fn object<T: Entity>() -> Self {
        FieldKind::Single(Element::Object(T::schema))
    }

    pub fn list(element: Element) -> Self {
        FieldKind::List(element)
    }

    pub fn list_of<T: Entity>() -> Self {
        FieldKind::List(Element::Object(T::schema))
    }
}

#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Declared wire shape of an entity.
#[derive(Debug, Clone)]
pub struct Schema {
    pub entity: &'static str,
    pub fields: Vec<FieldSpec>,
    /// Groups of fields of which exactly one must be present.
    pub exactly_one_of: Vec<Vec<&'static str>>,
}

impl Schema {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            fields: Vec::new(),
            exactly_one_of: Vec::new(),
        }
    }

    pub fn required(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: true,
        });
        self
    }

    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec {
            name,
            kind,
            required: false,
        });
        self
    }

    pub fn exactly_one_of(mut self, names: &[&'static str]) -> Self {
        self.exactly_one_of.push(names.to_vec());
        self
    }

    fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A protocol value with a declared wire schema.
pub trait Entity: Serialize + DeserializeOwned {
    const NAME: &'static str;

    fn schema() -> Schema;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Only the entity's own fields.
    Shallow,
    /// The entity and every nested object.
    Deep,
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

fn is_present(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

/// Checks `value` against `schema`, recording every mismatch. Returns true if none were found.
pub fn check_shape(
    value: &Value,
    schema: &Schema,
    depth: Depth,
    path: &str,
    report: &mut Report,
) -> bool {
    report.section(|report| {
        let Some(object) = value.as_object() else {
            report.error(format!(
                "{path}: expected a {} object but found {}: {value}",
                schema.entity,
                value_kind(value)
            ));
            return;
        };

        for field in &schema.fields {
            let field_path = format!("{path}.{}", field.name);
            match object.get(field.name) {
                None | Some(Value::Null) => {
                    if field.required {
                        report.error(format!(
                            "{field_path} is missing or null but {}.{} is required",
                            schema.entity, field.name
                        ));
                    }
                }
                Some(present) => check_field(present, field, depth, &field_path, report),
            }
        }

        for key in object.keys() {
            if schema.field(key).is_none() {
                report.error(format!(
                    "{path}.{key} is not a field of {} (unexpected parameter)",
                    schema.entity
                ));
            }
        }

        for group in &schema.exactly_one_of {
            let populated = group
                .iter()
                .filter(|name| is_present(object.get(**name)))
                .count();
            if populated != 1 {
                report.error(format!(
                    "{path}: exactly one of {} must be present; found {populated}",
                    group.join(", ")
                ));
            }
        }
    })
}

fn check_field(value: &Value, field: &FieldSpec, depth: Depth, path: &str, report: &mut Report) {
    match field.kind {
        FieldKind::Single(element) => check_element(value, element, depth, path, report),
        FieldKind::List(element) => {
            let Some(items) = value.as_array() else {
                report.error(format!(
                    "{path} has non list[{}] value: {value}",
                    element.describe()
                ));
                return;
            };
            for (idx, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{idx}]");
                if item.is_array() {
                    report.error(format!(
                        "{item_path} is a nested list; only single-level lists are supported"
                    ));
                    continue;
                }
                check_element(item, element, depth, &item_path, report);
            }
        }
    }
}

fn check_element(value: &Value, element: Element, depth: Depth, path: &str, report: &mut Report) {
    if !element.accepts(value) {
        report.error(format!(
            "{path} has non {} value: {value}",
            element.describe()
        ));
        return;
    }
    if let (Element::Object(schema), Depth::Deep) = (element, depth) {
        check_shape(value, &schema(), depth, path, report);
    }
}

/// Type checks shared by every typed entity: re-serializes it and checks its own fields.
///
/// Non-finite numbers serialize to `null`, so they surface here as missing required values.
pub fn validate_common<T: Entity>(entity: &T, report: &mut Report) -> bool {
    match serde_json::to_value(entity) {
        Ok(value) => check_shape(&value, &T::schema(), Depth::Shallow, T::NAME, report),
        Err(err) => {
            report.error(format!("{} could not be serialized for type checks: {err}", T::NAME));
            false
        }
    }
}

/// Runs the common checks, then `rule`, and tells whether neither recorded a failure.
pub fn with_common<T, F>(entity: &T, report: &mut Report, rule: F) -> bool
where
    T: Entity,
    F: FnOnce(&T, &mut Report),
{
    report.section(|report| {
        validate_common(entity, report);
        rule(entity, report);
    })
}

/// Converts untyped input into `T`, reporting the path of the first field that does not fit.
pub fn parse_entity<T: Entity>(raw: &Value) -> Result<T, ConversionError> {
    serde_path_to_error::deserialize(raw).map_err(|err| ConversionError {
        entity: T::NAME,
        path: err.path().to_string(),
        message: err.inner().to_string(),
        violations: Vec::new(),
    })
}

/// A typed entity together with the report produced while validating it.
#[derive(Debug, Clone)]
pub struct Checked<T> {
    pub entity: T,
    pub report: Report,
}

impl<T> Checked<T> {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Deep shape check of `raw`, conversion into `T`, then `rule` on the typed value.
///
/// When conversion fails the error carries every violation recorded for this input.
pub fn validate_json<T, F>(raw: &Value, rule: F) -> Result<Checked<T>, ConversionError>
where
    T: Entity,
    F: FnOnce(&T, &mut Report),
{
    validate_json_into(raw, Report::new(), rule)
}

/// Same as [`validate_json`], recording into `report` (e.g. a detached one).
pub fn validate_json_into<T, F>(
    raw: &Value,
    mut report: Report,
    rule: F,
) -> Result<Checked<T>, ConversionError>
where
    T: Entity,
    F: FnOnce(&T, &mut Report),
{
    check_shape(raw, &T::schema(), Depth::Deep, T::NAME, &mut report);
    match parse_entity::<T>(raw) {
        Ok(entity) => {
            rule(&entity, &mut report);
            Ok(Checked { entity, report })
        }
        Err(mut err) => {
            report.error(format!(
                "Unable to use input as {} for validation: {}",
                T::NAME,
                err
            ));
            err.violations = report.into_violations();
            Err(err)
        }
    }
}
