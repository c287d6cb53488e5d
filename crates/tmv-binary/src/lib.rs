#![deny(missing_docs)]

//! # tmv-binary — Binary Property Table Decoding
//!
//! Reads the values of a binary property table the way the metadata
//! schema declares them, without judging whether the declarations are
//! consistent (that is `tmv-validate`'s job).
//!
//! ## Layers
//!
//! - [`reader`]: little-endian components, vectors, matrices, bit-packed
//!   booleans and strings, plus [`normalize`](reader::normalize).
//! - [`offsets`]: array and string offset buffers.
//! - [`transform`]: `offset`/`scale` application and the broadcasting rule
//!   shared with the statistics checks.
//! - [`table`]: the [`BinaryPropertyTable`] aggregate and buffer layout.
//! - [`materialize`]: [`PropertyModel`], row values of one property.
//! - [`encode`]: builds a [`BinaryPropertyTable`] from logical values.
//!
//! Nothing in this crate performs I/O. Buffers are resolved before a
//! [`BinaryPropertyTable`] is built.

pub mod encode;
pub mod error;
pub mod materialize;
pub mod offsets;
pub mod reader;
pub mod table;
pub mod transform;

pub use encode::{create_binary_property_table, create_binary_property_table_with, EncodeOptions};
pub use error::{EncodeError, ReadError};
pub use materialize::PropertyModel;
pub use table::{
    BinaryBufferData, BinaryBufferStructure, BinaryPropertyTable, Buffer, BufferView,
};
