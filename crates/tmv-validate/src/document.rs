//! # Metadata Documents
//!
//! A metadata document bundles a schema (inline under `schema` or external
//! through `schemaUri`), buffers, buffer views and property tables:
//!
//! ```json
//! {
//!   "schema": { "classes": { ... }, "enums": { ... } },
//!   "buffers": [ { "uri": "data.bin", "byteLength": 128 } ],
//!   "bufferViews": [ { "buffer": 0, "byteOffset": 0, "byteLength": 16 } ],
//!   "propertyTables": [ { "class": "c", "count": 2, "properties": { ... } } ]
//! }
//! ```
//!
//! [`MetadataDocument::load`] reads a document for inspection and fails on
//! the first problem. [`DocumentValidator`] reads the same input but turns
//! every problem into a [`ValidationIssue`] and validates as much as it
//! can: structure first, then the binary data of each property table that
//! passed the structural checks.
//!
//! External schemas and buffers are fetched through the context's
//! [`ResourceResolver`].

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use tmv_binary::{
    BinaryBufferData, BinaryBufferStructure, BinaryPropertyTable, Buffer, BufferView,
};
use tmv_core::{
    FileResourceResolver, IssueType, PropertyTable, ResourceResolver, Schema, TmvError,
    ValidationContext, ValidationIssue, ValidationResult,
};

use crate::binary_table::BinaryPropertyTableValidator;
use crate::config::ValidatorConfig;
use crate::structure::StructureValidator;

// ---------------------------------------------------------------------------
// Typed document
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentJson {
    schema: Schema,
    #[serde(default)]
    buffers: Vec<Buffer>,
    #[serde(default)]
    buffer_views: Vec<BufferView>,
    #[serde(default)]
    property_tables: Vec<PropertyTable>,
}

/// A parsed metadata document with its buffers resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDocument {
    /// The schema, inline or resolved from `schemaUri`.
    pub schema: Schema,
    /// Declared buffers and buffer views.
    pub structure: BinaryBufferStructure,
    /// The property tables, in document order.
    pub property_tables: Vec<PropertyTable>,
    /// Bytes of every buffer and buffer view.
    pub data: BinaryBufferData,
}

impl MetadataDocument {
    /// Parse `text` and resolve its external schema and buffers.
    pub fn load(text: &str, resolver: &dyn ResourceResolver) -> Result<Self, TmvError> {
        let document: Value = serde_json::from_str(text)?;
        let document = inline_schema(document, resolver)?;
        let parsed = parse_document(&document)?;
        let buffers = parsed
            .buffers
            .iter()
            .enumerate()
            .map(|(index, buffer)| resolve_buffer(index, buffer, resolver))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::assemble(parsed, buffers))
    }

    /// Read a document from disk. Relative URIs resolve against the
    /// document's directory.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, TmvError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::load(&text, &FileResourceResolver::for_file(path))
    }

    fn assemble(parsed: DocumentJson, buffers_data: Vec<Vec<u8>>) -> Self {
        let structure = BinaryBufferStructure {
            buffers: parsed.buffers,
            buffer_views: parsed.buffer_views,
        };
        let data = BinaryBufferData::from_buffers(&structure, buffers_data);
        Self {
            schema: parsed.schema,
            structure,
            property_tables: parsed.property_tables,
            data,
        }
    }

    /// Number of property tables.
    pub fn table_count(&self) -> usize {
        self.property_tables.len()
    }

    /// Property table `index` with everything needed to read it.
    pub fn binary_property_table(&self, index: usize) -> Option<BinaryPropertyTable> {
        let property_table = self.property_tables.get(index)?;
        Some(BinaryPropertyTable {
            schema: self.schema.clone(),
            property_table: property_table.clone(),
            binary_buffer_structure: self.structure.clone(),
            binary_buffer_data: self.data.clone(),
        })
    }
}

/// Replace `schemaUri` by the schema it points to. Documents with an
/// inline schema, or with neither, are returned unchanged.
fn inline_schema(mut document: Value, resolver: &dyn ResourceResolver) -> Result<Value, TmvError> {
    let Some(object) = document.as_object_mut() else {
        return Ok(document);
    };
    if object.contains_key("schema") {
        return Ok(document);
    }
    let Some(uri) = object.get("schemaUri").and_then(Value::as_str) else {
        return Ok(document);
    };
    let uri = uri.to_string();
    let bytes = resolver
        .resolve_data(&uri)
        .ok_or(TmvError::Unresolved { uri: uri.clone() })?;
    let schema: Value = serde_json::from_slice(&bytes)?;
    tracing::debug!(uri, "external schema resolved");
    object.insert("schema".to_string(), schema);
    Ok(document)
}

fn parse_document(document: &Value) -> Result<DocumentJson, TmvError> {
    Ok(DocumentJson::deserialize(document)?)
}

fn resolve_buffer(
    index: usize,
    buffer: &Buffer,
    resolver: &dyn ResourceResolver,
) -> Result<Vec<u8>, TmvError> {
    let uri = buffer.uri.as_deref().ok_or_else(|| {
        TmvError::InvalidDocument(format!("buffer {index} has no uri"))
    })?;
    let data = resolver.resolve_data(uri).ok_or_else(|| TmvError::Unresolved {
        uri: uri.to_string(),
    })?;
    if (data.len() as u64) < buffer.byte_length {
        return Err(TmvError::InvalidDocument(format!(
            "buffer {index} ({uri}) has {} bytes, but declares a byteLength of {}",
            data.len(),
            buffer.byte_length
        )));
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates metadata documents end to end.
#[derive(Debug, Default)]
pub struct DocumentValidator {
    structure: StructureValidator,
    binary: BinaryPropertyTableValidator,
}

impl DocumentValidator {
    /// A validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            structure: StructureValidator::new(),
            binary: BinaryPropertyTableValidator::new(config),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ValidatorConfig {
        self.binary.config()
    }

    /// Validate a document file. Relative URIs resolve against the
    /// document's directory.
    ///
    /// Only failing to read the file itself is an error; everything else
    /// is reported in the result.
    pub fn validate_file(&self, path: impl AsRef<Path>) -> Result<ValidationResult, TmvError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut context = ValidationContext::new(Arc::new(FileResourceResolver::for_file(path)));
        tracing::info!(path = %path.display(), "validating document");
        self.validate_str(&text, &mut context);
        Ok(context.into_result())
    }

    /// Validate document text.
    pub fn validate_str(&self, text: &str, context: &mut ValidationContext) {
        match serde_json::from_str::<Value>(text) {
            Ok(document) => self.validate_value(document, context),
            Err(e) => context.add_issue(ValidationIssue::error(
                IssueType::JsonParseError,
                "",
                format!("The document is not valid JSON: {e}"),
            )),
        }
    }

    /// Validate a parsed document.
    pub fn validate_value(&self, document: Value, context: &mut ValidationContext) {
        let document = match inline_schema(document, context.resolver()) {
            Ok(document) => document,
            Err(e) => {
                let issue_type = match e {
                    TmvError::Unresolved { .. } => IssueType::IoError,
                    TmvError::Json(_) => IssueType::JsonParseError,
                    _ => IssueType::JsonValueInvalid,
                };
                context.add_issue(ValidationIssue::error(
                    issue_type,
                    "/schemaUri",
                    format!("The external schema could not be read: {e}"),
                ));
                return;
            }
        };

        let outcome = self.structure.validate(&document, context);
        if !outcome.shape_valid() {
            return;
        }
        let parsed = match parse_document(&document) {
            Ok(parsed) => parsed,
            Err(e) => {
                context.add_issue(ValidationIssue::error(
                    IssueType::JsonValueInvalid,
                    "",
                    format!("The document could not be read: {e}"),
                ));
                return;
            }
        };

        let mut usable = Vec::with_capacity(parsed.buffers.len());
        let mut buffers_data = Vec::with_capacity(parsed.buffers.len());
        for (index, buffer) in parsed.buffers.iter().enumerate() {
            match resolve_buffer(index, buffer, context.resolver()) {
                Ok(data) => {
                    usable.push(true);
                    buffers_data.push(data);
                }
                Err(e) => {
                    let (issue_type, path) = match &e {
                        TmvError::InvalidDocument(_) if buffer.uri.is_some() => {
                            (IssueType::BufferViewOutOfBounds, format!("/buffers/{index}"))
                        }
                        _ => (IssueType::IoError, format!("/buffers/{index}/uri")),
                    };
                    context.add_issue(ValidationIssue::error(
                        issue_type,
                        path,
                        format!("Buffer {index} is not usable: {e}"),
                    ));
                    usable.push(false);
                    buffers_data.push(Vec::new());
                }
            }
        }

        let document = MetadataDocument::assemble(parsed, buffers_data);
        for index in 0..document.table_count() {
            let path = format!("/propertyTables/{index}");
            if !outcome.table_is_valid(index) {
                tracing::debug!(path, "binary checks skipped after structural issues");
                continue;
            }
            let Some(table) = document.binary_property_table(index) else {
                continue;
            };
            if !buffers_usable(&table, &usable) {
                tracing::debug!(path, "binary checks skipped, buffer not usable");
                continue;
            }
            self.binary.validate(&path, &table, context);
        }
    }
}

/// Whether every buffer view the table references lies in a usable buffer.
fn buffers_usable(table: &BinaryPropertyTable, usable: &[bool]) -> bool {
    table
        .property_table
        .properties
        .iter()
        .flat_map(|(_, p)| [Some(p.values), p.array_offsets, p.string_offsets])
        .flatten()
        .filter_map(|view| table.buffer_view(view))
        .all(|view| usable.get(view.buffer).copied().unwrap_or(false))
}

/// Validate the document at `path` with the given configuration.
pub fn validate_document_file(
    path: impl AsRef<Path>,
    config: &ValidatorConfig,
) -> Result<ValidationResult, TmvError> {
    DocumentValidator::new(config.clone()).validate_file(path)
}
