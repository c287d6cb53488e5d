//! # Property Table Encoder
//!
//! Builds a one-property [`BinaryPropertyTable`] from logical row values.
//! Used to synthesize valid tables which tests then break on purpose, and
//! by tools that need a binary table for a handful of values.
//!
//! Layout: a single buffer holding the `values` view, then the
//! `arrayOffsets` view (variable-length arrays), then the `stringOffsets`
//! view (strings), each starting at a multiple of 8 bytes.
//!
//! Row values are given in the stored domain: integers for integer
//! components (before normalization, offset and scale) and enum values as
//! names or integers.

use tmv_core::{
    ArrayShape, ClassProperty, ComponentType, MetadataClass, MetadataEnum, MetadataValue, Number,
    NumericType, OffsetType, OrderedMap, PropertyKind, PropertyTable, PropertyTableProperty,
    Schema,
};

use crate::error::EncodeError;
use crate::reader::write_le;
use crate::table::{
    BinaryBufferData, BinaryBufferStructure, BinaryPropertyTable, Buffer, BufferView,
};

/// Class ID used for encoded tables.
pub const ENCODED_CLASS_NAME: &str = "class";

const VIEW_ALIGNMENT: usize = 8;

/// Offset types used by the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Type of the array offsets.
    pub array_offset_type: OffsetType,
    /// Type of the string offsets.
    pub string_offset_type: OffsetType,
}

/// Encode `values` (one per row) as property `property_name` with default
/// (`UINT32`) offset types.
pub fn create_binary_property_table(
    property_name: &str,
    class_property: &ClassProperty,
    values: &[MetadataValue],
    enums: &OrderedMap<MetadataEnum>,
) -> Result<BinaryPropertyTable, EncodeError> {
    create_binary_property_table_with(
        property_name,
        class_property,
        values,
        enums,
        EncodeOptions::default(),
    )
}

/// Encode `values` (one per row) as property `property_name`.
pub fn create_binary_property_table_with(
    property_name: &str,
    class_property: &ClassProperty,
    values: &[MetadataValue],
    enums: &OrderedMap<MetadataEnum>,
    options: EncodeOptions,
) -> Result<BinaryPropertyTable, EncodeError> {
    let elements = flatten_rows(class_property.array, values)?;

    let mut values_bytes = Vec::new();
    let mut string_offsets = None;
    match &class_property.kind {
        PropertyKind::Boolean => {
            values_bytes = vec![0u8; elements.len().div_ceil(8)];
            for (i, (row, element)) in elements.iter().enumerate() {
                let bit = element.as_bool().ok_or_else(|| shape(*row, "expected a boolean"))?;
                if bit {
                    values_bytes[i >> 3] |= 1 << (i & 7);
                }
            }
        }
        PropertyKind::String => {
            let mut offsets = vec![0u64];
            for (row, element) in &elements {
                let s = element.as_str().ok_or_else(|| shape(*row, "expected a string"))?;
                values_bytes.extend_from_slice(s.as_bytes());
                offsets.push(values_bytes.len() as u64);
            }
            string_offsets = Some(encode_offsets(&offsets, options.string_offset_type)?);
        }
        PropertyKind::Enum { enum_type } => {
            let enumeration = enums
                .get(enum_type)
                .ok_or_else(|| EncodeError::MissingEnum(enum_type.clone()))?;
            for (row, element) in &elements {
                let raw = match element {
                    MetadataValue::String(name) => enumeration.value_of(name).ok_or_else(|| {
                        EncodeError::UnknownEnumName {
                            enum_type: enum_type.clone(),
                            name: name.clone(),
                        }
                    })?,
                    MetadataValue::Number(Number::Integer(i)) => i64::try_from(*i).map_err(|_| {
                        EncodeError::NotRepresentable {
                            value: i.to_string(),
                            component_type: enumeration.value_type,
                        }
                    })?,
                    _ => return Err(shape(*row, "expected an enum name or integer")),
                };
                write_component(&mut values_bytes, Number::from(raw), enumeration.value_type)?;
            }
        }
        PropertyKind::Numeric(numeric) => {
            for (row, element) in &elements {
                write_numeric(
                    &mut values_bytes,
                    *row,
                    element,
                    numeric.numeric_type,
                    numeric.component_type,
                )?;
            }
        }
    }

    let array_offsets = match class_property.array {
        ArrayShape::Variable => {
            let mut offsets = vec![0u64];
            for row in values {
                let len = row.as_array().map_or(0, <[MetadataValue]>::len);
                let last = offsets.last().copied().unwrap_or(0);
                offsets.push(last + len as u64);
            }
            Some(encode_offsets(&offsets, options.array_offset_type)?)
        }
        _ => None,
    };

    let mut buffer = Vec::new();
    let mut views = Vec::new();
    let mut append_view = |bytes: &[u8]| {
        buffer.resize(buffer.len().next_multiple_of(VIEW_ALIGNMENT), 0);
        views.push(BufferView {
            buffer: 0,
            byte_offset: buffer.len() as u64,
            byte_length: bytes.len() as u64,
            name: None,
        });
        buffer.extend_from_slice(bytes);
        views.len() - 1
    };

    let mut table_property = PropertyTableProperty::new(append_view(&values_bytes));
    table_property.array_offset_type = options.array_offset_type;
    table_property.string_offset_type = options.string_offset_type;
    if let Some(bytes) = &array_offsets {
        table_property.array_offsets = Some(append_view(bytes));
    }
    if let Some(bytes) = &string_offsets {
        table_property.string_offsets = Some(append_view(bytes));
    }
    buffer.resize(buffer.len().next_multiple_of(VIEW_ALIGNMENT), 0);

    let structure = BinaryBufferStructure {
        buffers: vec![Buffer {
            uri: None,
            byte_length: buffer.len() as u64,
            name: None,
        }],
        buffer_views: views,
    };
    let data = BinaryBufferData::from_buffers(&structure, vec![buffer]);

    let mut class = MetadataClass::default();
    class.properties.insert(property_name, class_property.clone());
    let mut schema = Schema::default();
    schema.classes.insert(ENCODED_CLASS_NAME, class);
    schema.enums = enums.clone();

    let mut property_table = PropertyTable {
        name: None,
        class: ENCODED_CLASS_NAME.to_string(),
        count: values.len() as u64,
        properties: OrderedMap::new(),
    };
    property_table.properties.insert(property_name, table_property);

    tracing::trace!(
        property = property_name,
        rows = values.len(),
        elements = elements.len(),
        "encoded property table"
    );

    Ok(BinaryPropertyTable {
        schema,
        property_table,
        binary_buffer_structure: structure,
        binary_buffer_data: data,
    })
}

/// Split rows into `(row, element)` pairs according to the array shape.
fn flatten_rows(
    array: ArrayShape,
    values: &[MetadataValue],
) -> Result<Vec<(usize, &MetadataValue)>, EncodeError> {
    let mut elements = Vec::new();
    for (row, value) in values.iter().enumerate() {
        match array {
            ArrayShape::Single => elements.push((row, value)),
            ArrayShape::Fixed(n) => {
                let items = value.as_array().ok_or_else(|| shape(row, "expected an array"))?;
                if items.len() as u64 != n {
                    return Err(shape(
                        row,
                        &format!("expected {n} elements, got {}", items.len()),
                    ));
                }
                elements.extend(items.iter().map(|v| (row, v)));
            }
            ArrayShape::Variable => {
                let items = value.as_array().ok_or_else(|| shape(row, "expected an array"))?;
                elements.extend(items.iter().map(|v| (row, v)));
            }
        }
    }
    Ok(elements)
}

fn write_numeric(
    out: &mut Vec<u8>,
    row: usize,
    element: &MetadataValue,
    numeric_type: NumericType,
    component_type: ComponentType,
) -> Result<(), EncodeError> {
    if numeric_type.is_scalar() {
        let n = element.as_number().ok_or_else(|| shape(row, "expected a number"))?;
        return write_component(out, n, component_type);
    }
    let components = element
        .as_array()
        .filter(|c| c.len() == numeric_type.component_count())
        .ok_or_else(|| {
            shape(
                row,
                &format!("expected {} components", numeric_type.component_count()),
            )
        })?;
    for c in components {
        let n = c.as_number().ok_or_else(|| shape(row, "expected a number"))?;
        write_component(out, n, component_type)?;
    }
    Ok(())
}

/// Append one component. Integer types require an in-range integer.
pub fn write_component(
    out: &mut Vec<u8>,
    n: Number,
    component_type: ComponentType,
) -> Result<(), EncodeError> {
    let not_representable = || EncodeError::NotRepresentable {
        value: n.to_string(),
        component_type,
    };
    let int = || match n {
        Number::Integer(i) => Ok(i),
        Number::Float(_) => Err(not_representable()),
    };
    match component_type {
        ComponentType::Int8 => write_le(out, i8::try_from(int()?).map_err(|_| not_representable())?),
        ComponentType::Uint8 => write_le(out, u8::try_from(int()?).map_err(|_| not_representable())?),
        ComponentType::Int16 => {
            write_le(out, i16::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Uint16 => {
            write_le(out, u16::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Int32 => {
            write_le(out, i32::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Uint32 => {
            write_le(out, u32::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Int64 => {
            write_le(out, i64::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Uint64 => {
            write_le(out, u64::try_from(int()?).map_err(|_| not_representable())?)
        }
        ComponentType::Float32 => write_le(out, n.as_f64() as f32),
        ComponentType::Float64 => write_le(out, n.as_f64()),
    }
    Ok(())
}

/// Encode offsets as `offset_type` integers.
pub fn encode_offsets(offsets: &[u64], offset_type: OffsetType) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(offsets.len() * offset_type.byte_size());
    for &o in offsets {
        write_component(&mut out, Number::from(o), offset_type.component_type())?;
    }
    Ok(out)
}

fn shape(row: usize, message: &str) -> EncodeError {
    EncodeError::Shape {
        row,
        message: message.to_string(),
    }
}
