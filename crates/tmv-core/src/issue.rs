//! # Validation Issue Model
//!
//! Every problem the validator detects is a [`ValidationIssue`]: a stable
//! type tag, a JSON-pointer-like path to the offending element, a
//! human-readable message and a severity.
//!
//! Issues accumulate in a [`ValidationResult`], an append-only sequence
//! that is never deduplicated. The order of detection is the order of
//! appearance. A [`ValidationContext`] owns one result and the
//! [`ResourceResolver`] available to collaborators; each validation run
//! gets its own context, so independent runs share no mutable state.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::resolver::{NullResourceResolver, ResourceResolver};

// ---------------------------------------------------------------------------
// Severity and type tags
// ---------------------------------------------------------------------------

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// The input is invalid.
    Error,
    /// The input is valid but questionable.
    Warning,
    /// Informational.
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        })
    }
}

/// Issue taxonomy. The serialized tags are a stable contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// A buffer view offset is not a multiple of the width read from it.
    MetadataInvalidAlignment,
    /// A buffer view length does not match the data it must hold.
    MetadataInvalidLength,
    /// Array or string offsets decrease.
    MetadataInvalidOffsets,
    /// A value lies outside a declared `min`/`max`.
    MetadataValueNotInRange,
    /// A property table `min`/`max` differs from the actual extreme.
    MetadataValueMismatch,
    /// A value is not one of the allowed values (enum membership).
    ValueNotInList,
    /// The input is not parseable JSON.
    JsonParseError,
    /// The JSON does not have the required shape.
    JsonValueInvalid,
    /// A required property is absent.
    PropertyMissing,
    /// A property is present where its type forbids it.
    TypeMismatch,
    /// A referenced class, enum or property does not exist.
    IdentifierNotFound,
    /// A numeric field (index, count) is out of its allowed range.
    ValueNotInRange,
    /// Two enum values share a name or a value.
    EnumValueDuplicate,
    /// A buffer view reaches past the end of its buffer.
    BufferViewOutOfBounds,
    /// A resource could not be read.
    IoError,
}

impl IssueType {
    /// The stable tag string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MetadataInvalidAlignment => "METADATA_INVALID_ALIGNMENT",
            Self::MetadataInvalidLength => "METADATA_INVALID_LENGTH",
            Self::MetadataInvalidOffsets => "METADATA_INVALID_OFFSETS",
            Self::MetadataValueNotInRange => "METADATA_VALUE_NOT_IN_RANGE",
            Self::MetadataValueMismatch => "METADATA_VALUE_MISMATCH",
            Self::ValueNotInList => "VALUE_NOT_IN_LIST",
            Self::JsonParseError => "JSON_PARSE_ERROR",
            Self::JsonValueInvalid => "JSON_VALUE_INVALID",
            Self::PropertyMissing => "PROPERTY_MISSING",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::IdentifierNotFound => "IDENTIFIER_NOT_FOUND",
            Self::ValueNotInRange => "VALUE_NOT_IN_RANGE",
            Self::EnumValueDuplicate => "ENUM_VALUE_DUPLICATE",
            Self::BufferViewOutOfBounds => "BUFFER_VIEW_OUT_OF_BOUNDS",
            Self::IoError => "IO_ERROR",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ValidationIssue
// ---------------------------------------------------------------------------

/// One detected problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Taxonomy tag.
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Location of the offending element, e.g.
    /// `/propertyTables/0/properties/height`.
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Severity.
    pub severity: Severity,
}

impl ValidationIssue {
    /// An issue with explicit severity.
    pub fn new(
        issue_type: IssueType,
        path: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            issue_type,
            path: path.into(),
            message: message.into(),
            severity,
        }
    }

    /// An `ERROR` issue.
    pub fn error(issue_type: IssueType, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(issue_type, path, message, Severity::Error)
    }

    /// A `WARNING` issue.
    pub fn warning(
        issue_type: IssueType,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(issue_type, path, message, Severity::Warning)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "(root)" } else { &self.path };
        write!(f, "{} {} {}: {}", self.severity, self.issue_type, path, self.message)
    }
}

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

/// Append-only, ordered collection of issues.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// An empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an issue.
    pub fn add(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Number of issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether no issues were recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// The issue at a position.
    pub fn get(&self, index: usize) -> Option<&ValidationIssue> {
        self.issues.get(index)
    }

    /// All issues in detection order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Iterate over issues in detection order.
    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    /// Number of issues with the given severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Whether any `ERROR` issue was recorded.
    pub fn has_errors(&self) -> bool {
        self.count_severity(Severity::Error) > 0
    }

    /// Issue type tags in detection order.
    pub fn issue_types(&self) -> Vec<IssueType> {
        self.issues.iter().map(|i| i.issue_type).collect()
    }

    /// Append every issue of another result.
    pub fn extend(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    /// Consume and return the issues.
    pub fn into_inner(self) -> Vec<ValidationIssue> {
        self.issues
    }

    /// JSON report: counts per severity and the issue list.
    pub fn to_report(&self) -> serde_json::Value {
        serde_json::json!({
            "numErrors": self.count_severity(Severity::Error),
            "numWarnings": self.count_severity(Severity::Warning),
            "numInfos": self.count_severity(Severity::Info),
            "issues": self.issues,
        })
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, issue) in self.issues.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ValidationResult {
    type Item = &'a ValidationIssue;
    type IntoIter = std::slice::Iter<'a, ValidationIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

// ---------------------------------------------------------------------------
// ValidationContext
// ---------------------------------------------------------------------------

/// Per-run validation state: the issue accumulator and the resolver
/// collaborators use to fetch external resources.
///
/// A context is owned by exactly one validation run. Running independent
/// validations concurrently requires one context per run and nothing else.
pub struct ValidationContext {
    result: ValidationResult,
    resolver: Arc<dyn ResourceResolver>,
}

impl ValidationContext {
    /// A context whose collaborators resolve resources through `resolver`.
    pub fn new(resolver: Arc<dyn ResourceResolver>) -> Self {
        Self {
            result: ValidationResult::new(),
            resolver,
        }
    }

    /// Record an issue.
    pub fn add_issue(&mut self, issue: ValidationIssue) {
        tracing::trace!(issue_type = %issue.issue_type, path = %issue.path, "issue recorded");
        self.result.add(issue);
    }

    /// The issues recorded so far.
    pub fn result(&self) -> &ValidationResult {
        &self.result
    }

    /// Number of issues recorded so far.
    pub fn issue_count(&self) -> usize {
        self.result.len()
    }

    /// The resource resolver.
    pub fn resolver(&self) -> &dyn ResourceResolver {
        self.resolver.as_ref()
    }

    /// A fresh context sharing this context's resolver.
    pub fn derive(&self) -> Self {
        Self::new(Arc::clone(&self.resolver))
    }

    /// Consume the context and return its result.
    pub fn into_result(self) -> ValidationResult {
        self.result
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(Arc::new(NullResourceResolver))
    }
}

impl fmt::Debug for ValidationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("issues", &self.result.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_type_tags_are_stable() {
        let json = serde_json::to_value(IssueType::MetadataInvalidAlignment).unwrap();
        assert_eq!(json, "METADATA_INVALID_ALIGNMENT");
        assert_eq!(IssueType::ValueNotInList.as_str(), "VALUE_NOT_IN_LIST");
        assert_eq!(
            serde_json::to_value(IssueType::MetadataValueMismatch).unwrap(),
            IssueType::MetadataValueMismatch.as_str()
        );
    }

    #[test]
    fn result_keeps_duplicates_in_order() {
        let mut result = ValidationResult::new();
        let issue = ValidationIssue::error(IssueType::ValueNotInList, "/a", "bad");
        result.add(issue.clone());
        result.add(ValidationIssue::warning(IssueType::IoError, "/b", "later"));
        result.add(issue);
        assert_eq!(
            result.issue_types(),
            vec![IssueType::ValueNotInList, IssueType::IoError, IssueType::ValueNotInList]
        );
        assert_eq!(result.count_severity(Severity::Error), 2);
        assert!(result.has_errors());
    }

    #[test]
    fn issue_display() {
        let issue = ValidationIssue::error(
            IssueType::MetadataInvalidLength,
            "/propertyTables/0/properties/p",
            "too short",
        );
        assert_eq!(
            issue.to_string(),
            "ERROR METADATA_INVALID_LENGTH /propertyTables/0/properties/p: too short"
        );
    }

    #[test]
    fn report_counts_severities() {
        let mut result = ValidationResult::new();
        result.add(ValidationIssue::error(IssueType::IoError, "", "x"));
        result.add(ValidationIssue::warning(IssueType::IoError, "", "y"));
        let report = result.to_report();
        assert_eq!(report["numErrors"], 1);
        assert_eq!(report["numWarnings"], 1);
        assert_eq!(report["issues"][0]["type"], "IO_ERROR");
        assert_eq!(report["issues"][1]["severity"], "WARNING");
    }

    #[test]
    fn derived_context_starts_empty() {
        let mut ctx = ValidationContext::default();
        ctx.add_issue(ValidationIssue::error(IssueType::IoError, "", "x"));
        let derived = ctx.derive();
        assert_eq!(ctx.issue_count(), 1);
        assert_eq!(derived.issue_count(), 0);
        assert!(derived.resolver().resolve_data("anything").is_none());
    }
}
