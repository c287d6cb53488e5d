#![deny(missing_docs)]

//! # tmv-validate — Property Table Validation
//!
//! Judges whether the binary data of a property table agrees with its
//! declarations, and whether a metadata document is well formed enough for
//! that question to be asked.
//!
//! ## Layers
//!
//! - [`binary_table`]: [`BinaryPropertyTableValidator`], the binary checks:
//!   alignment, buffer view lengths, offset monotonicity, enum membership
//!   and declared-versus-computed `min`/`max`.
//! - [`statistics`]: component-wise extremes and their comparison with
//!   declared bounds.
//! - [`structure`]: [`StructureValidator`], JSON Schema shape checks and
//!   cross references.
//! - [`document`]: [`DocumentValidator`] and [`MetadataDocument`], which
//!   resolve external resources and run both layers.
//! - [`config`]: [`ValidatorConfig`], from defaults, environment or file.
//!
//! ## Crate Policy
//!
//! - Findings go to a [`ValidationContext`](tmv_core::ValidationContext);
//!   malformed input never panics and never aborts sibling checks.
//! - Validators hold no per-run state. One validator can serve concurrent
//!   runs, each with its own context.

pub mod binary_table;
pub mod config;
pub mod document;
pub mod statistics;
pub mod structure;

pub use binary_table::{validate_binary_property_table, BinaryPropertyTableValidator};
pub use config::{ConfigError, ValidatorConfig, DEFAULT_FLOAT_EPSILON};
pub use document::{validate_document_file, DocumentValidator, MetadataDocument};
pub use statistics::{Discrepancy, ValueStatistics};
pub use structure::{StructureOutcome, StructureValidator, DOCUMENT_SCHEMA};
