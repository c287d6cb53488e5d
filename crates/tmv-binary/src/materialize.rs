//! # Property Value Materializer
//!
//! [`PropertyModel`] binds one property of a [`BinaryPropertyTable`] to its
//! buffer view bytes and computes row values from them:
//!
//! - [`PropertyModel::raw_value`]: the stored value. Enums stay integers,
//!   no normalization or transform.
//! - [`PropertyModel::value`]: the final value: normalized, scaled, offset,
//!   enum integers resolved to names.
//! - [`PropertyModel::entity_value`]: the final value with `noData`
//!   replaced by `default`.
//!
//! Table-level `offset` and `scale` take precedence over the class-level
//! ones.

use std::ops::Range;

use tmv_core::{
    ArrayShape, ClassProperty, ComponentType, MetadataEnum, MetadataValue, Number,
    PropertyKind, PropertyTableProperty,
};

use crate::error::ReadError;
use crate::offsets::{element_range, to_usize};
use crate::reader::{
    element_byte_offset, normalize, read_boolean, read_component, read_numeric_value, read_string,
};
use crate::table::BinaryPropertyTable;
use crate::transform::apply_scale_offset;

/// One property of a binary property table, ready to be read row by row.
#[derive(Debug, Clone)]
pub struct PropertyModel<'a> {
    name: String,
    class_property: &'a ClassProperty,
    table_property: &'a PropertyTableProperty,
    enumeration: Option<&'a MetadataEnum>,
    count: u64,
    values: &'a [u8],
    array_offsets: Option<&'a [u8]>,
    string_offsets: Option<&'a [u8]>,
}

impl<'a> PropertyModel<'a> {
    /// Bind property `name` of `table`.
    pub fn new(table: &'a BinaryPropertyTable, name: &str) -> Result<Self, ReadError> {
        let missing = || ReadError::MissingProperty {
            name: name.to_string(),
        };
        let class_property = table.class_property(name).ok_or_else(missing)?;
        let table_property = table.table_property(name).ok_or_else(missing)?;
        let enumeration = match class_property.enum_type() {
            Some(enum_type) => Some(table.enumeration(enum_type).ok_or_else(|| {
                ReadError::MissingEnum {
                    name: enum_type.to_string(),
                }
            })?),
            None => None,
        };
        let values = table.buffer_view_data(table_property.values)?;
        let array_offsets = match (class_property.array, table_property.array_offsets) {
            (ArrayShape::Variable, Some(index)) => Some(table.buffer_view_data(index)?),
            (ArrayShape::Variable, None) => {
                return Err(ReadError::MissingOffsets {
                    name: name.to_string(),
                    which: "arrayOffsets",
                })
            }
            _ => None,
        };
        let string_offsets = match (&class_property.kind, table_property.string_offsets) {
            (PropertyKind::String, Some(index)) => Some(table.buffer_view_data(index)?),
            (PropertyKind::String, None) => {
                return Err(ReadError::MissingOffsets {
                    name: name.to_string(),
                    which: "stringOffsets",
                })
            }
            _ => None,
        };
        Ok(Self {
            name: name.to_string(),
            class_property,
            table_property,
            enumeration,
            count: table.count(),
            values,
            array_offsets,
            string_offsets,
        })
    }

    /// Property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class declaration.
    pub fn class_property(&self) -> &ClassProperty {
        self.class_property
    }

    /// Table entry.
    pub fn table_property(&self) -> &PropertyTableProperty {
        self.table_property
    }

    /// The enum of an `ENUM` property.
    pub fn enumeration(&self) -> Option<&MetadataEnum> {
        self.enumeration
    }

    /// Number of rows.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Effective `offset`: the table's if declared, otherwise the class's.
    pub fn offset(&self) -> Option<&'a MetadataValue> {
        let class = self.class_property.numeric_property()?;
        self.table_property.offset.as_ref().or(class.offset.as_ref())
    }

    /// Effective `scale`: the table's if declared, otherwise the class's.
    pub fn scale(&self) -> Option<&'a MetadataValue> {
        let class = self.class_property.numeric_property()?;
        self.table_property.scale.as_ref().or(class.scale.as_ref())
    }

    /// Indices of the elements stored for `row`.
    pub fn element_range(&self, row: u64) -> Result<Range<usize>, ReadError> {
        if row >= self.count {
            return Err(ReadError::RowOutOfRange {
                row,
                count: self.count,
            });
        }
        let row = to_usize(row)?;
        match self.class_property.array {
            ArrayShape::Single => Ok(row..row + 1),
            ArrayShape::Fixed(n) => {
                let n = to_usize(n)?;
                let too_large = ReadError::OffsetTooLarge { value: u64::MAX };
                let start = row.checked_mul(n).ok_or(too_large.clone())?;
                let end = start.checked_add(n).ok_or(too_large)?;
                Ok(start..end)
            }
            ArrayShape::Variable => {
                let offsets = self.array_offsets.unwrap_or_default();
                element_range(offsets, self.table_property.array_offset_type, row)
            }
        }
    }

    /// Read element `index` of the flat element sequence.
    pub fn raw_element(&self, index: usize) -> Result<MetadataValue, ReadError> {
        match &self.class_property.kind {
            PropertyKind::Boolean => read_boolean(self.values, index).map(MetadataValue::Boolean),
            PropertyKind::String => {
                let offsets = self.string_offsets.unwrap_or_default();
                let range = element_range(offsets, self.table_property.string_offset_type, index)?;
                read_string(self.values, range.start, range.len()).map(MetadataValue::String)
            }
            PropertyKind::Enum { .. } => {
                let value_type = self.enum_value_type();
                let offset = element_byte_offset(index, value_type.byte_size())?;
                read_component(self.values, offset, value_type).map(MetadataValue::Number)
            }
            PropertyKind::Numeric(numeric) => {
                let element_size =
                    numeric.numeric_type.component_count() * numeric.component_type.byte_size();
                read_numeric_value(
                    self.values,
                    element_byte_offset(index, element_size)?,
                    numeric.numeric_type,
                    numeric.component_type,
                )
            }
        }
    }

    /// The stored value of `row`.
    pub fn raw_value(&self, row: u64) -> Result<MetadataValue, ReadError> {
        let range = self.element_range(row)?;
        if !self.class_property.array.is_array() {
            return self.raw_element(range.start);
        }
        range
            .map(|i| self.raw_element(i))
            .collect::<Result<Vec<_>, _>>()
            .map(MetadataValue::Array)
    }

    /// The final value of `row`.
    pub fn value(&self, row: u64) -> Result<MetadataValue, ReadError> {
        self.raw_value(row).map(|raw| self.final_value(&raw))
    }

    /// The final value of `row`, or the declared `default` where the stored
    /// value is `noData`. `None` when the row is `noData` and no default is
    /// declared.
    pub fn entity_value(&self, row: u64) -> Result<Option<MetadataValue>, ReadError> {
        let raw = self.raw_value(row)?;
        if self.is_no_data(&raw) {
            tracing::trace!(property = %self.name, row, "noData value");
            return Ok(self.class_property.default.clone());
        }
        Ok(Some(self.final_value(&raw)))
    }

    /// Map a stored value to the final domain.
    pub fn final_value(&self, raw: &MetadataValue) -> MetadataValue {
        match &self.class_property.kind {
            PropertyKind::Numeric(numeric) => {
                let component_type = numeric.component_type;
                let normalized = if numeric.normalized {
                    raw.map_numbers(&|n| normalize(n, component_type))
                } else {
                    raw.clone()
                };
                apply_scale_offset(&normalized, self.scale(), self.offset())
            }
            PropertyKind::Enum { .. } => self.enum_names(raw),
            PropertyKind::Boolean | PropertyKind::String => raw.clone(),
        }
    }

    /// The declared `noData` in the stored domain. Enum names are resolved
    /// to their integers.
    pub fn no_data_raw(&self) -> Option<MetadataValue> {
        let no_data = self.class_property.no_data.as_ref()?;
        match self.enumeration {
            Some(enumeration) => Some(enum_integers(no_data, enumeration)),
            None => Some(no_data.clone()),
        }
    }

    /// Whether a stored value equals the declared `noData`.
    pub fn is_no_data(&self, raw: &MetadataValue) -> bool {
        self.no_data_raw().is_some_and(|no_data| no_data == *raw)
    }

    fn enum_value_type(&self) -> ComponentType {
        self.enumeration
            .map(|e| e.value_type)
            .unwrap_or(ComponentType::Int16)
    }

    fn enum_names(&self, raw: &MetadataValue) -> MetadataValue {
        let Some(enumeration) = self.enumeration else {
            return raw.clone();
        };
        match raw {
            MetadataValue::Number(Number::Integer(i)) => match enumeration.name_of(*i) {
                Some(name) => MetadataValue::String(name.to_string()),
                None => raw.clone(),
            },
            MetadataValue::Array(items) => {
                MetadataValue::Array(items.iter().map(|v| self.enum_names(v)).collect())
            }
            other => other.clone(),
        }
    }
}

fn enum_integers(value: &MetadataValue, enumeration: &MetadataEnum) -> MetadataValue {
    match value {
        MetadataValue::String(name) => match enumeration.value_of(name) {
            Some(v) => MetadataValue::from(v),
            None => value.clone(),
        },
        MetadataValue::Array(items) => {
            MetadataValue::Array(items.iter().map(|v| enum_integers(v, enumeration)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{create_binary_property_table, create_binary_property_table_with, EncodeOptions};
    use serde_json::json;
    use tmv_core::{NumericType, OffsetType, OrderedMap};

    fn v(json: serde_json::Value) -> MetadataValue {
        MetadataValue::from_json(&json).unwrap()
    }

    fn rows(json: serde_json::Value) -> Vec<MetadataValue> {
        match v(json) {
            MetadataValue::Array(items) => items,
            other => vec![other],
        }
    }

    #[test]
    fn scalar_values_with_class_offset() {
        let property = ClassProperty::scalar(ComponentType::Int16)
            .with_numeric(|n| n.offset = Some(MetadataValue::from(100i64)));
        let table = create_binary_property_table(
            "p",
            &property,
            &rows(json!([10, 12])),
            &OrderedMap::new(),
        )
        .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.raw_value(0).unwrap(), MetadataValue::from(10i64));
        assert_eq!(model.value(1).unwrap(), MetadataValue::from(112i64));
        assert!(matches!(
            model.value(2),
            Err(ReadError::RowOutOfRange { row: 2, count: 2 })
        ));
    }

    #[test]
    fn table_offset_overrides_class_offset() {
        let property = ClassProperty::scalar(ComponentType::Uint8)
            .with_numeric(|n| n.offset = Some(MetadataValue::from(100i64)));
        let mut table =
            create_binary_property_table("p", &property, &rows(json!([1])), &OrderedMap::new())
                .unwrap();
        let mut stored = table.table_property("p").unwrap().clone();
        stored.offset = Some(MetadataValue::from(5i64));
        table.property_table.properties.insert("p", stored);
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.value(0).unwrap(), MetadataValue::from(6i64));
    }

    #[test]
    fn normalized_vectors() {
        let property = ClassProperty::numeric(NumericType::Vec2, ComponentType::Uint8)
            .with_numeric(|n| n.normalized = true);
        let table = create_binary_property_table(
            "p",
            &property,
            &rows(json!([[0, 255]])),
            &OrderedMap::new(),
        )
        .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.value(0).unwrap(), v(json!([0.0, 1.0])));
    }

    #[test]
    fn variable_length_string_arrays() {
        let property = ClassProperty::string().with_array(ArrayShape::Variable);
        let table = create_binary_property_table(
            "p",
            &property,
            &rows(json!([["a", "bc"], [], ["def"]])),
            &OrderedMap::new(),
        )
        .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.value(0).unwrap(), v(json!(["a", "bc"])));
        assert_eq!(model.value(1).unwrap(), v(json!([])));
        assert_eq!(model.value(2).unwrap(), v(json!(["def"])));
    }

    #[test]
    fn boolean_arrays_read_from_bit_offsets() {
        let property = ClassProperty::boolean().with_array(ArrayShape::Variable);
        let table = create_binary_property_table(
            "p",
            &property,
            &rows(json!([[true], [false, true, true]])),
            &OrderedMap::new(),
        )
        .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.value(1).unwrap(), v(json!([false, true, true])));
    }

    #[test]
    fn enums_resolve_names_and_no_data() {
        let mut enums = OrderedMap::new();
        enums.insert("color", MetadataEnum::new([("RED", 0), ("GREEN", 1), ("NONE", 99)]));
        let property = ClassProperty::enumeration("color")
            .with_no_data("NONE")
            .with_default("RED");
        let table =
            create_binary_property_table("p", &property, &rows(json!(["GREEN", "NONE"])), &enums)
                .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.raw_value(1).unwrap(), MetadataValue::from(99i64));
        assert_eq!(model.value(0).unwrap(), MetadataValue::from("GREEN"));
        assert_eq!(model.value(1).unwrap(), MetadataValue::from("NONE"));
        assert_eq!(model.entity_value(1).unwrap(), Some(MetadataValue::from("RED")));
    }

    #[test]
    fn no_data_without_default_is_absent() {
        let property = ClassProperty::scalar(ComponentType::Int32).with_no_data(-1i64);
        let table = create_binary_property_table(
            "p",
            &property,
            &rows(json!([-1, 4])),
            &OrderedMap::new(),
        )
        .unwrap();
        let model = PropertyModel::new(&table, "p").unwrap();
        assert_eq!(model.entity_value(0).unwrap(), None);
        assert_eq!(model.entity_value(1).unwrap(), Some(MetadataValue::from(4i64)));
    }

    #[test]
    fn missing_property_is_an_error() {
        let property = ClassProperty::boolean();
        let table =
            create_binary_property_table("p", &property, &rows(json!([true])), &OrderedMap::new())
                .unwrap();
        assert!(matches!(
            PropertyModel::new(&table, "q"),
            Err(ReadError::MissingProperty { .. })
        ));
    }

    #[test]
    fn huge_array_offsets_are_an_error() {
        let property = ClassProperty::scalar(ComponentType::Int64).with_array(ArrayShape::Variable);
        let options = EncodeOptions {
            array_offset_type: OffsetType::Uint64,
            ..EncodeOptions::default()
        };
        let mut table = create_binary_property_table_with(
            "p",
            &property,
            &rows(json!([[7]])),
            &OrderedMap::new(),
            options,
        )
        .unwrap();
        let view = table.table_property("p").unwrap().array_offsets.unwrap();
        let mut offsets = Vec::new();
        offsets.extend_from_slice(&(1u64 << 61).to_le_bytes());
        offsets.extend_from_slice(&((1u64 << 61) + 1).to_le_bytes());
        table.binary_buffer_data.buffer_views_data[view] = offsets;

        let model = PropertyModel::new(&table, "p").unwrap();
        assert!(matches!(
            model.raw_value(0),
            Err(ReadError::OffsetTooLarge { .. })
        ));
        assert!(model.entity_value(0).is_err());
    }
}
