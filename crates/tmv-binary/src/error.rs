//! Errors raised while decoding or encoding binary property data.
//!
//! A [`ReadError`] means the bytes could not be interpreted the way the
//! declarations say. The validator never surfaces these directly: it runs
//! its structural checks first, and a read error that still happens is
//! logged and turns into a skipped check.

use thiserror::Error;

use tmv_core::ComponentType;

/// Failure to read a value out of binary property data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// A read extends past the end of the available bytes.
    #[error("reading {size} bytes at offset {offset} exceeds buffer of {available} bytes")]
    OutOfBounds {
        /// Byte offset of the read.
        offset: usize,
        /// Number of bytes requested.
        size: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// An offset buffer entry is smaller than its predecessor.
    #[error("offset {index} decreases from {start} to {end}")]
    DecreasingOffsets {
        /// Index of the entry whose end precedes its start.
        index: usize,
        /// Start offset.
        start: u64,
        /// End offset.
        end: u64,
    },

    /// An offset value does not fit the address space.
    #[error("offset {value} is too large")]
    OffsetTooLarge {
        /// The offending value.
        value: u64,
    },

    /// A row index at or past the table row count.
    #[error("row {row} out of range for {count} rows")]
    RowOutOfRange {
        /// Requested row.
        row: u64,
        /// Row count of the table.
        count: u64,
    },

    /// A buffer view index without data.
    #[error("no data for buffer view {index}")]
    MissingBufferView {
        /// The buffer view index.
        index: usize,
    },

    /// A property name not present in the class or the table.
    #[error("property \"{name}\" not found")]
    MissingProperty {
        /// The property name.
        name: String,
    },

    /// An `enumType` not present in the schema.
    #[error("enum \"{name}\" not found")]
    MissingEnum {
        /// The enum ID.
        name: String,
    },

    /// A property that needs offsets was declared without them.
    #[error("property \"{name}\" has no {which} buffer view")]
    MissingOffsets {
        /// The property name.
        name: String,
        /// `arrayOffsets` or `stringOffsets`.
        which: &'static str,
    },
}

/// Failure to encode logical values into a property table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    /// A row value does not have the shape the class property declares.
    #[error("row {row}: {message}")]
    Shape {
        /// Row index.
        row: usize,
        /// What was wrong.
        message: String,
    },

    /// A number cannot be stored as the component type.
    #[error("{value} cannot be stored as {component_type}")]
    NotRepresentable {
        /// The rejected number, formatted.
        value: String,
        /// The target component type.
        component_type: ComponentType,
    },

    /// An enum value name that the enum does not declare.
    #[error("enum \"{enum_type}\" has no value named \"{name}\"")]
    UnknownEnumName {
        /// The enum ID.
        enum_type: String,
        /// The rejected name.
        name: String,
    },

    /// An `enumType` that is not in the supplied enums.
    #[error("enum \"{0}\" not found")]
    MissingEnum(String),
}
