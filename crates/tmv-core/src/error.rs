//! # Error Hierarchy
//!
//! Operational errors for the validator, built with `thiserror`.
//!
//! Validation findings are not errors. A malformed property table is
//! reported through [`ValidationIssue`](crate::issue::ValidationIssue)
//! values; the types here cover the cases where the validator itself
//! cannot proceed (unreadable input, unparseable JSON, bad configuration).

use thiserror::Error;

/// Top-level error type for the validator crates.
#[derive(Error, Debug)]
pub enum TmvError {
    /// A type tag was not part of the catalog.
    #[error("unknown {kind} tag: \"{tag}\"")]
    UnknownTag {
        /// Which tag family was being parsed (`componentType`, `type`, ...).
        kind: &'static str,
        /// The rejected tag.
        tag: String,
    },

    /// A JSON value could not be converted into a metadata value.
    #[error("invalid metadata value: {0}")]
    InvalidValue(String),

    /// A resource could not be resolved.
    #[error("could not resolve resource \"{uri}\"")]
    Unresolved {
        /// The URI that was requested.
        uri: String,
    },

    /// The document is not usable as validator input.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
