#![deny(missing_docs)]

//! # tmv-core — Foundational Types for the Metadata Validator
//!
//! Leaf crate of the workspace. Defines the vocabulary every other crate
//! speaks: the numeric type catalog, the logical value model, the typed
//! schema and property table model, the validation issue model, and the
//! resource resolution interface.
//!
//! ## Design Principles
//!
//! 1. **Tags are parsed once.** `componentType`, `type` and offset type
//!    strings become [`ComponentType`], [`ElementType`] and [`OffsetType`]
//!    at the JSON boundary. Downstream lookups are exhaustive `match`es.
//!
//! 2. **Class properties are a tagged union.** [`PropertyKind`] carries only
//!    the fields legal for each kind, so "offset on a STRING property"
//!    cannot be represented.
//!
//! 3. **Findings are data.** Problems with the input are
//!    [`ValidationIssue`]s appended to a [`ValidationResult`]. [`TmvError`]
//!    is reserved for the validator being unable to run.
//!
//! 4. **Exact 64-bit integers.** [`Number::Integer`] is an `i128`, so every
//!    `INT64`/`UINT64` value is represented without rounding.

pub mod error;
pub mod issue;
pub mod resolver;
pub mod schema;
pub mod types;
pub mod value;

// Re-export primary types at crate root for ergonomic imports.
pub use error::TmvError;
pub use issue::{IssueType, Severity, ValidationContext, ValidationIssue, ValidationResult};
pub use resolver::{
    FileResourceResolver, InMemoryResourceResolver, NullResourceResolver, ResourceResolver,
};
pub use schema::{
    ArrayShape, ClassProperty, ClassPropertyJson, EnumValue, MetadataClass, MetadataEnum,
    NumericProperty, OrderedMap, PropertyKind, PropertyTable, PropertyTableProperty, Schema,
};
pub use types::{ComponentType, ElementType, NumericType, OffsetType};
pub use value::{MetadataValue, Number};
