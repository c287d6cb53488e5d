//! # Structural Validation
//!
//! Checks a metadata document before any binary data is read:
//!
//! - **Shape.** The document is validated against the embedded JSON Schema
//!   (Draft 2020-12) in `schemas/metadata-document.schema.json`. Every
//!   violation becomes a `JSON_VALUE_INVALID` issue at its instance path.
//! - **Schema consistency.** Numeric properties carry a `componentType`,
//!   `ENUM` properties name an existing enum, fields only legal for numeric
//!   types appear only there, and enum values are unique and fit their
//!   `valueType`.
//! - **Buffer layout.** Every buffer view names an existing buffer and lies
//!   inside it.
//! - **Property tables.** The class exists, every stored property exists in
//!   the class, required properties are stored, buffer view indices are in
//!   range, and the offset views a property needs are present.
//!
//! The outcome records, per property table, whether the binary checks may
//! run on it. A document that fails the shape check is not inspected
//! further.

use std::collections::HashSet;

use serde_json::{Map, Value};

use tmv_core::{ComponentType, ElementType, IssueType, ValidationContext, ValidationIssue};

/// The JSON Schema every metadata document must satisfy.
pub const DOCUMENT_SCHEMA: &str = include_str!("../schemas/metadata-document.schema.json");

/// Fields that are only meaningful on numeric properties.
const NUMERIC_ONLY_FIELDS: [&str; 5] = ["normalized", "offset", "scale", "min", "max"];

/// Validates the structure of metadata documents.
pub struct StructureValidator {
    validator: Option<jsonschema::Validator>,
}

impl std::fmt::Debug for StructureValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureValidator")
            .field("shape_checks", &self.validator.is_some())
            .finish()
    }
}

impl Default for StructureValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StructureValidator {
    /// Compile the embedded document schema.
    ///
    /// The schema is a build-time constant and compiling it is covered by
    /// the unit tests. Should it still fail, the error is logged, the shape
    /// check is skipped and the cross-reference checks still run.
    pub fn new() -> Self {
        let schema: Value = match serde_json::from_str(DOCUMENT_SCHEMA) {
            Ok(schema) => schema,
            Err(e) => {
                tracing::error!(error = %e, "document schema is not valid JSON, shape checks disabled");
                return Self { validator: None };
            }
        };
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft202012);
        match opts.build(&schema) {
            Ok(validator) => Self {
                validator: Some(validator),
            },
            Err(e) => {
                tracing::error!(error = %e, "document schema does not compile, shape checks disabled");
                Self { validator: None }
            }
        }
    }

    /// Validate `document`, whose schema must already be inline under
    /// `schema`.
    pub fn validate(&self, document: &Value, context: &mut ValidationContext) -> StructureOutcome {
        let table_count = document
            .get("propertyTables")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let mut outcome = StructureOutcome {
            shape_valid: self.check_shape(document, context),
            schema_valid: false,
            buffers_valid: false,
            tables_valid: vec![false; table_count],
        };
        if !outcome.shape_valid {
            return outcome;
        }

        let empty = Map::new();
        let schema = document
            .get("schema")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        outcome.schema_valid = check_schema(schema, context);
        outcome.buffers_valid = check_buffer_views(document, context);

        let view_count = document
            .get("bufferViews")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let tables = document.get("propertyTables").and_then(Value::as_array);
        for (index, table) in tables.into_iter().flatten().enumerate() {
            let path = format!("/propertyTables/{index}");
            outcome.tables_valid[index] =
                check_property_table(&path, table, schema, view_count, context);
        }
        tracing::debug!(
            schema_valid = outcome.schema_valid,
            buffers_valid = outcome.buffers_valid,
            tables = table_count,
            "structure checked"
        );
        outcome
    }

    fn check_shape(&self, document: &Value, context: &mut ValidationContext) -> bool {
        let Some(validator) = &self.validator else {
            return true;
        };
        let mut valid = true;
        for error in validator.iter_errors(document) {
            valid = false;
            context.add_issue(ValidationIssue::error(
                IssueType::JsonValueInvalid,
                error.instance_path.to_string(),
                error.to_string(),
            ));
        }
        valid
    }
}

/// Which parts of a document passed the structural checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureOutcome {
    shape_valid: bool,
    schema_valid: bool,
    buffers_valid: bool,
    tables_valid: Vec<bool>,
}

impl StructureOutcome {
    /// Whether the document has the shape the typed model expects.
    pub fn shape_valid(&self) -> bool {
        self.shape_valid
    }

    /// Whether every structural check passed.
    pub fn is_valid(&self) -> bool {
        self.shape_valid
            && self.schema_valid
            && self.buffers_valid
            && self.tables_valid.iter().all(|v| *v)
    }

    /// Whether the binary checks may run on property table `index`.
    pub fn table_is_valid(&self, index: usize) -> bool {
        self.shape_valid
            && self.schema_valid
            && self.buffers_valid
            && self.tables_valid.get(index).copied().unwrap_or(false)
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

fn entries<'a>(value: Option<&'a Value>) -> impl Iterator<Item = (&'a String, &'a Value)> {
    value.and_then(Value::as_object).into_iter().flatten()
}

fn add(context: &mut ValidationContext, issue_type: IssueType, path: String, message: String) {
    context.add_issue(ValidationIssue::error(issue_type, path, message));
}

fn check_schema(schema: &Map<String, Value>, context: &mut ValidationContext) -> bool {
    let before = context.issue_count();
    for (id, enumeration) in entries(schema.get("enums")) {
        check_enum(&format!("/schema/enums/{id}"), id, enumeration, context);
    }
    for (class_id, class) in entries(schema.get("classes")) {
        for (id, property) in entries(class.get("properties")) {
            let path = format!("/schema/classes/{class_id}/properties/{id}");
            check_class_property(&path, id, property, schema, context);
        }
    }
    context.issue_count() == before
}

fn check_enum(path: &str, id: &str, enumeration: &Value, context: &mut ValidationContext) {
    let value_type = enumeration
        .get("valueType")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ComponentType>().ok())
        .unwrap_or(ComponentType::Int16);
    let mut names = HashSet::new();
    let mut values = HashSet::new();
    let items = enumeration.get("values").and_then(Value::as_array);
    for (index, item) in items.into_iter().flatten().enumerate() {
        let path = format!("{path}/values/{index}");
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            if !names.insert(name) {
                add(
                    context,
                    IssueType::EnumValueDuplicate,
                    path.clone(),
                    format!("Enum '{id}' declares the name '{name}' more than once"),
                );
            }
        }
        let value = item.get("value").and_then(|v| {
            v.as_i64()
                .map(i128::from)
                .or_else(|| v.as_u64().map(i128::from))
        });
        let Some(value) = value else {
            continue;
        };
        if !values.insert(value) {
            add(
                context,
                IssueType::EnumValueDuplicate,
                path.clone(),
                format!("Enum '{id}' declares the value {value} more than once"),
            );
        }
        let fits = match (value_type.min_integer(), value_type.max_integer()) {
            (Some(min), Some(max)) => (min..=max).contains(&value),
            _ => true,
        };
        if !fits {
            add(
                context,
                IssueType::ValueNotInRange,
                format!("{path}/value"),
                format!("Enum '{id}' declares the value {value}, which does not fit its valueType {value_type}"),
            );
        }
    }
}

fn check_class_property(
    path: &str,
    id: &str,
    property: &Value,
    schema: &Map<String, Value>,
    context: &mut ValidationContext,
) {
    let Some(element_type) = property
        .get("type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<ElementType>().ok())
    else {
        return;
    };
    let component_type = property.get("componentType").and_then(Value::as_str);

    if element_type.numeric().is_some() {
        match component_type.and_then(|s| s.parse::<ComponentType>().ok()) {
            None => add(
                context,
                IssueType::PropertyMissing,
                path.to_string(),
                format!("Property '{id}' has type {element_type} but no componentType"),
            ),
            Some(ct) if !ct.is_integer() && property.get("normalized") == Some(&Value::Bool(true)) => {
                add(
                    context,
                    IssueType::TypeMismatch,
                    format!("{path}/normalized"),
                    format!("Property '{id}' is normalized, but its componentType {ct} is not an integer type"),
                )
            }
            Some(_) => {}
        }
    } else {
        if let Some(ct) = component_type {
            add(
                context,
                IssueType::TypeMismatch,
                format!("{path}/componentType"),
                format!("Property '{id}' has type {element_type}, which takes no componentType, but declares {ct}"),
            );
        }
        for field in NUMERIC_ONLY_FIELDS {
            if property.get(field).is_some() {
                add(
                    context,
                    IssueType::TypeMismatch,
                    format!("{path}/{field}"),
                    format!("Property '{id}' has type {element_type}, which does not allow '{field}'"),
                );
            }
        }
    }

    let enum_type = property.get("enumType").and_then(Value::as_str);
    match (element_type, enum_type) {
        (ElementType::Enum, None) => add(
            context,
            IssueType::PropertyMissing,
            path.to_string(),
            format!("Property '{id}' has type ENUM but no enumType"),
        ),
        (ElementType::Enum, Some(enum_type)) => {
            let known = schema
                .get("enums")
                .and_then(|enums| enums.get(enum_type))
                .is_some();
            if !known {
                add(
                    context,
                    IssueType::IdentifierNotFound,
                    format!("{path}/enumType"),
                    format!("Property '{id}' refers to the enum '{enum_type}', which the schema does not declare"),
                );
            }
        }
        (_, Some(enum_type)) => add(
            context,
            IssueType::TypeMismatch,
            format!("{path}/enumType"),
            format!("Property '{id}' has type {element_type} but declares the enumType '{enum_type}'"),
        ),
        (_, None) => {}
    }
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

fn check_buffer_views(document: &Value, context: &mut ValidationContext) -> bool {
    let before = context.issue_count();
    let buffers = document
        .get("buffers")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let views = document.get("bufferViews").and_then(Value::as_array);
    for (index, view) in views.into_iter().flatten().enumerate() {
        let path = format!("/bufferViews/{index}");
        let Some(buffer_index) = view.get("buffer").and_then(Value::as_u64) else {
            continue;
        };
        let buffer = usize::try_from(buffer_index)
            .ok()
            .and_then(|i| buffers.get(i));
        let Some(buffer) = buffer else {
            add(
                context,
                IssueType::ValueNotInRange,
                format!("{path}/buffer"),
                format!(
                    "Buffer view {index} refers to buffer {buffer_index}, but there are only {} buffers",
                    buffers.len()
                ),
            );
            continue;
        };
        let buffer_length = buffer.get("byteLength").and_then(Value::as_u64).unwrap_or(0);
        let offset = view.get("byteOffset").and_then(Value::as_u64).unwrap_or(0);
        let length = view.get("byteLength").and_then(Value::as_u64).unwrap_or(0);
        let end = offset.checked_add(length);
        if end.map_or(true, |end| end > buffer_length) {
            add(
                context,
                IssueType::BufferViewOutOfBounds,
                path,
                format!(
                    "Buffer view {index} covers bytes {offset} to {} of buffer {buffer_index}, \
                     which has a byteLength of {buffer_length}",
                    offset.saturating_add(length)
                ),
            );
        }
    }
    context.issue_count() == before
}

// ---------------------------------------------------------------------------
// Property tables
// ---------------------------------------------------------------------------

fn check_property_table(
    path: &str,
    table: &Value,
    schema: &Map<String, Value>,
    view_count: usize,
    context: &mut ValidationContext,
) -> bool {
    let before = context.issue_count();
    let Some(class_id) = table.get("class").and_then(Value::as_str) else {
        return false;
    };
    let Some(class) = schema.get("classes").and_then(|c| c.get(class_id)) else {
        add(
            context,
            IssueType::IdentifierNotFound,
            format!("{path}/class"),
            format!("Property table refers to the class '{class_id}', which the schema does not declare"),
        );
        return false;
    };
    let class_properties = class.get("properties");

    for (name, property) in entries(table.get("properties")) {
        let property_path = format!("{path}/properties/{name}");
        let Some(class_property) = class_properties.and_then(|p| p.get(name)) else {
            add(
                context,
                IssueType::IdentifierNotFound,
                property_path,
                format!("Property '{name}' is not a property of class '{class_id}'"),
            );
            continue;
        };
        for field in ["values", "arrayOffsets", "stringOffsets"] {
            let Some(index) = property.get(field).and_then(Value::as_u64) else {
                continue;
            };
            if usize::try_from(index).map_or(true, |i| i >= view_count) {
                add(
                    context,
                    IssueType::ValueNotInRange,
                    format!("{property_path}/{field}"),
                    format!(
                        "The {field} of property '{name}' refer to buffer view {index}, but there \
                         are only {view_count} buffer views"
                    ),
                );
            }
        }
        let element_type = class_property.get("type").and_then(Value::as_str);
        let is_array = class_property.get("array") == Some(&Value::Bool(true));
        let is_variable = is_array && class_property.get("count").is_none();
        if is_variable && property.get("arrayOffsets").is_none() {
            add(
                context,
                IssueType::PropertyMissing,
                property_path.clone(),
                format!("Property '{name}' is a variable-length array but has no arrayOffsets"),
            );
        }
        if element_type == Some("STRING") && property.get("stringOffsets").is_none() {
            add(
                context,
                IssueType::PropertyMissing,
                property_path.clone(),
                format!("Property '{name}' has type STRING but no stringOffsets"),
            );
        }
        let is_numeric = element_type
            .and_then(|s| s.parse::<ElementType>().ok())
            .is_some_and(|t| t.numeric().is_some());
        if !is_numeric {
            for field in ["offset", "scale", "min", "max"] {
                if property.get(field).is_some() {
                    add(
                        context,
                        IssueType::TypeMismatch,
                        format!("{property_path}/{field}"),
                        format!("Property '{name}' is not numeric and does not allow '{field}'"),
                    );
                }
            }
        }
    }

    for (name, class_property) in entries(class_properties) {
        let required = class_property.get("required") == Some(&Value::Bool(true));
        let stored = table
            .get("properties")
            .and_then(|p| p.get(name))
            .is_some();
        if required && !stored {
            add(
                context,
                IssueType::PropertyMissing,
                format!("{path}/properties"),
                format!("Required property '{name}' of class '{class_id}' is not stored"),
            );
        }
    }
    context.issue_count() == before
}
