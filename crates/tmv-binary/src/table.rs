//! # Binary Property Tables
//!
//! A [`BinaryPropertyTable`] is everything the validation core needs for
//! one property table: the resolved schema, the property table JSON, the
//! declared buffer layout, and the bytes of every buffer view. It is built
//! once and only read afterwards.
//!
//! The declared layout ([`BinaryBufferStructure`]) and the bytes
//! ([`BinaryBufferData`]) are kept apart. Declared offsets and lengths are
//! what the validator checks; the bytes are what it reads.

use serde::{Deserialize, Serialize};

use tmv_core::{
    ClassProperty, MetadataClass, MetadataEnum, PropertyTable, PropertyTableProperty, Schema,
};

use crate::error::ReadError;

/// A binary buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buffer {
    /// Where the bytes live; absent for embedded buffers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Declared length in bytes.
    pub byte_length: u64,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A byte range of a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferView {
    /// Index of the buffer.
    pub buffer: usize,
    /// Start of the range within the buffer.
    #[serde(default)]
    pub byte_offset: u64,
    /// Length of the range.
    pub byte_length: u64,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BufferView {
    /// End of the range within the buffer, `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.byte_offset.checked_add(self.byte_length)
    }
}

/// The declared buffers and buffer views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryBufferStructure {
    /// Buffers.
    #[serde(default)]
    pub buffers: Vec<Buffer>,
    /// Buffer views.
    #[serde(default)]
    pub buffer_views: Vec<BufferView>,
}

/// The bytes of each buffer and of each buffer view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryBufferData {
    /// Bytes of each buffer, by buffer index.
    pub buffers_data: Vec<Vec<u8>>,
    /// Bytes of each buffer view, by buffer view index.
    pub buffer_views_data: Vec<Vec<u8>>,
}

impl BinaryBufferData {
    /// Slice every buffer view out of its buffer.
    ///
    /// Views that point outside their buffer get the bytes that do exist,
    /// possibly none.
    pub fn from_buffers(structure: &BinaryBufferStructure, buffers_data: Vec<Vec<u8>>) -> Self {
        let buffer_views_data = structure
            .buffer_views
            .iter()
            .map(|view| {
                let Some(buffer) = buffers_data.get(view.buffer) else {
                    return Vec::new();
                };
                let start = clamp(view.byte_offset, buffer.len());
                let end = clamp(view.end().unwrap_or(u64::MAX), buffer.len());
                buffer[start..end.max(start)].to_vec()
            })
            .collect();
        Self {
            buffers_data,
            buffer_views_data,
        }
    }
}

fn clamp(offset: u64, len: usize) -> usize {
    usize::try_from(offset).map_or(len, |o| o.min(len))
}

/// One property table with its schema and binary data.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryPropertyTable {
    /// The schema the table is an instance of.
    pub schema: Schema,
    /// The property table.
    pub property_table: PropertyTable,
    /// Declared buffers and buffer views.
    pub binary_buffer_structure: BinaryBufferStructure,
    /// Buffer and buffer view bytes.
    pub binary_buffer_data: BinaryBufferData,
}

impl BinaryPropertyTable {
    /// ID of the class the table instantiates.
    pub fn class_name(&self) -> &str {
        &self.property_table.class
    }

    /// Row count shared by every property.
    pub fn count(&self) -> u64 {
        self.property_table.count
    }

    /// The class the table instantiates.
    pub fn class(&self) -> Option<&MetadataClass> {
        self.schema.class(self.class_name())
    }

    /// Class declaration of a property.
    pub fn class_property(&self, name: &str) -> Option<&ClassProperty> {
        self.class()?.properties.get(name)
    }

    /// Table entry of a property.
    pub fn table_property(&self, name: &str) -> Option<&PropertyTableProperty> {
        self.property_table.properties.get(name)
    }

    /// An enum of the schema.
    pub fn enumeration(&self, name: &str) -> Option<&MetadataEnum> {
        self.schema.enumeration(name)
    }

    /// Declared buffer view.
    pub fn buffer_view(&self, index: usize) -> Option<&BufferView> {
        self.binary_buffer_structure.buffer_views.get(index)
    }

    /// Bytes of a buffer view.
    pub fn buffer_view_data(&self, index: usize) -> Result<&[u8], ReadError> {
        self.binary_buffer_data
            .buffer_views_data
            .get(index)
            .map(Vec::as_slice)
            .ok_or(ReadError::MissingBufferView { index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure() -> BinaryBufferStructure {
        serde_json::from_value(serde_json::json!({
            "buffers": [{"byteLength": 16}],
            "bufferViews": [
                {"buffer": 0, "byteOffset": 0, "byteLength": 4},
                {"buffer": 0, "byteOffset": 8, "byteLength": 8},
                {"buffer": 0, "byteOffset": 12, "byteLength": 8},
                {"buffer": 3, "byteLength": 1}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn slices_buffer_views() {
        let buffer: Vec<u8> = (0..16).collect();
        let data = BinaryBufferData::from_buffers(&structure(), vec![buffer]);
        assert_eq!(data.buffer_views_data[0], vec![0, 1, 2, 3]);
        assert_eq!(data.buffer_views_data[1], (8..16).collect::<Vec<u8>>());
    }

    #[test]
    fn out_of_range_views_get_available_bytes() {
        let buffer: Vec<u8> = (0..16).collect();
        let data = BinaryBufferData::from_buffers(&structure(), vec![buffer]);
        assert_eq!(data.buffer_views_data[2], vec![12, 13, 14, 15]);
        assert!(data.buffer_views_data[3].is_empty());
    }

    #[test]
    fn buffer_view_defaults_offset() {
        let view: BufferView =
            serde_json::from_value(serde_json::json!({"buffer": 0, "byteLength": 3})).unwrap();
        assert_eq!(view.byte_offset, 0);
        assert_eq!(view.end(), Some(3));
    }
}
