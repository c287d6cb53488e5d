//! # Binary Value Reader
//!
//! Bounds-checked little-endian reads of single components, vectors and
//! matrices, bit-packed booleans, and UTF-8 strings. Everything here is
//! pure: a function of the bytes and the declared types.
//!
//! 64-bit integers come back as [`Number::Integer`] (an `i128`), never as a
//! double, so `UINT64` values above 2^53 survive unchanged.
//!
//! [`normalize`] implements the integer-to-unit-interval mapping used by
//! `normalized` properties.

use tmv_core::{ComponentType, MetadataValue, NumericType, Number};

use crate::error::ReadError;

/// Primitive types that can be read from and written to little-endian bytes.
pub trait LeBytes: Sized + Copy {
    /// Fixed-size byte array for this type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode from little-endian bytes.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encode as little-endian bytes.
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_le_bytes {
    ($($t:ty),* $(,)?) => {
        $(
            impl LeBytes for $t {
                type Bytes = [u8; std::mem::size_of::<$t>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$t>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_le_bytes!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Read a `T` at `offset`.
pub fn read_le<T: LeBytes>(data: &[u8], offset: usize) -> Result<T, ReadError> {
    let size = std::mem::size_of::<T>();
    let out_of_bounds = ReadError::OutOfBounds {
        offset,
        size,
        available: data.len(),
    };
    let end = match offset.checked_add(size) {
        Some(end) if end <= data.len() => end,
        _ => return Err(out_of_bounds),
    };
    let Ok(bytes) = data[offset..end].try_into() else {
        return Err(out_of_bounds);
    };
    Ok(T::from_le_bytes(bytes))
}

/// Append a `T` to `out`.
pub fn write_le<T: LeBytes>(out: &mut Vec<u8>, value: T) {
    out.extend_from_slice(value.to_le_bytes().as_ref());
}

/// Read one component of `component_type` at `byte_offset`.
pub fn read_component(
    data: &[u8],
    byte_offset: usize,
    component_type: ComponentType,
) -> Result<Number, ReadError> {
    let n = match component_type {
        ComponentType::Int8 => Number::Integer(read_le::<i8>(data, byte_offset)? as i128),
        ComponentType::Uint8 => Number::Integer(read_le::<u8>(data, byte_offset)? as i128),
        ComponentType::Int16 => Number::Integer(read_le::<i16>(data, byte_offset)? as i128),
        ComponentType::Uint16 => Number::Integer(read_le::<u16>(data, byte_offset)? as i128),
        ComponentType::Int32 => Number::Integer(read_le::<i32>(data, byte_offset)? as i128),
        ComponentType::Uint32 => Number::Integer(read_le::<u32>(data, byte_offset)? as i128),
        ComponentType::Int64 => Number::Integer(read_le::<i64>(data, byte_offset)? as i128),
        ComponentType::Uint64 => Number::Integer(read_le::<u64>(data, byte_offset)? as i128),
        ComponentType::Float32 => Number::Float(read_le::<f32>(data, byte_offset)? as f64),
        ComponentType::Float64 => Number::Float(read_le::<f64>(data, byte_offset)?),
    };
    Ok(n)
}

/// Byte offset of element `index` when every element takes `element_size`
/// bytes.
pub fn element_byte_offset(index: usize, element_size: usize) -> Result<usize, ReadError> {
    index
        .checked_mul(element_size)
        .ok_or(ReadError::OffsetTooLarge {
            value: index as u64,
        })
}

/// Read one scalar, vector or matrix starting at `element_byte_offset`.
///
/// Scalars come back as a number, everything else as an array of
/// `numeric_type.component_count()` numbers in storage order.
pub fn read_numeric_value(
    data: &[u8],
    element_byte_offset: usize,
    numeric_type: NumericType,
    component_type: ComponentType,
) -> Result<MetadataValue, ReadError> {
    if numeric_type.is_scalar() {
        return read_component(data, element_byte_offset, component_type).map(MetadataValue::Number);
    }
    let size = component_type.byte_size();
    (0..numeric_type.component_count())
        .map(|i| {
            let offset = element_byte_offset
                .checked_add(i * size)
                .ok_or(ReadError::OutOfBounds {
                    offset: element_byte_offset,
                    size,
                    available: data.len(),
                })?;
            read_component(data, offset, component_type).map(MetadataValue::Number)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(MetadataValue::Array)
}

/// Read bit `bit_index` of a bit-packed boolean buffer (LSB first).
pub fn read_boolean(data: &[u8], bit_index: usize) -> Result<bool, ReadError> {
    let byte = bit_index >> 3;
    let Some(b) = data.get(byte) else {
        return Err(ReadError::OutOfBounds {
            offset: byte,
            size: 1,
            available: data.len(),
        });
    };
    Ok((b >> (bit_index & 7)) & 1 == 1)
}

/// Decode `byte_length` bytes at `byte_offset` as UTF-8. Invalid sequences
/// are replaced with U+FFFD.
pub fn read_string(data: &[u8], byte_offset: usize, byte_length: usize) -> Result<String, ReadError> {
    let end = byte_offset
        .checked_add(byte_length)
        .filter(|&end| end <= data.len())
        .ok_or(ReadError::OutOfBounds {
            offset: byte_offset,
            size: byte_length,
            available: data.len(),
        })?;
    Ok(String::from_utf8_lossy(&data[byte_offset..end]).into_owned())
}

/// Map a raw integer component to `[0, 1]` (unsigned) or `[-1, 1]` (signed).
///
/// The divisor is the largest positive value of the type for both signed
/// and unsigned types, so the most negative signed value would land slightly
/// below -1 and is clamped. Floats pass through unchanged.
pub fn normalize(value: Number, component_type: ComponentType) -> Number {
    let Some(max) = component_type.max_integer() else {
        return value;
    };
    let x = value.as_f64() / max as f64;
    if component_type.is_signed() {
        Number::Float(x.max(-1.0))
    } else {
        Number::Float(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_offsets_do_not_overflow() {
        assert_eq!(element_byte_offset(3, 8), Ok(24));
        assert_eq!(
            element_byte_offset(usize::MAX / 2, 4),
            Err(ReadError::OffsetTooLarge {
                value: (usize::MAX / 2) as u64
            })
        );
        let data = [0u8; 16];
        assert!(matches!(
            read_numeric_value(&data, usize::MAX - 1, NumericType::Vec2, ComponentType::Uint16),
            Err(ReadError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn reads_little_endian_integers() {
        let data = [0x34, 0x12, 0xff, 0xff];
        assert_eq!(
            read_component(&data, 0, ComponentType::Uint16).unwrap(),
            Number::Integer(0x1234)
        );
        assert_eq!(
            read_component(&data, 2, ComponentType::Int16).unwrap(),
            Number::Integer(-1)
        );
        assert_eq!(
            read_component(&data, 2, ComponentType::Uint16).unwrap(),
            Number::Integer(65535)
        );
    }

    #[test]
    fn uint64_keeps_full_precision() {
        let data = u64::MAX.to_le_bytes();
        let n = read_component(&data, 0, ComponentType::Uint64).unwrap();
        assert_eq!(n, Number::Integer(u64::MAX as i128));
        let data = (9_007_199_254_740_993_i64).to_le_bytes();
        let n = read_component(&data, 0, ComponentType::Int64).unwrap();
        assert!(matches!(n, Number::Integer(9_007_199_254_740_993)));
    }

    #[test]
    fn reads_floats() {
        let mut data = Vec::new();
        write_le(&mut data, 1.5_f32);
        write_le(&mut data, -2.25_f64);
        assert_eq!(
            read_component(&data, 0, ComponentType::Float32).unwrap(),
            Number::Float(1.5)
        );
        assert_eq!(
            read_component(&data, 4, ComponentType::Float64).unwrap(),
            Number::Float(-2.25)
        );
    }

    #[test]
    fn out_of_bounds_read_is_an_error() {
        let data = [0u8; 3];
        let err = read_component(&data, 0, ComponentType::Uint32).unwrap_err();
        assert_eq!(
            err,
            ReadError::OutOfBounds {
                offset: 0,
                size: 4,
                available: 3
            }
        );
        assert!(read_component(&data, usize::MAX, ComponentType::Uint8).is_err());
    }

    #[test]
    fn reads_vectors_in_component_order() {
        let mut data = Vec::new();
        for v in [1i16, -2, 3] {
            write_le(&mut data, v);
        }
        let v = read_numeric_value(&data, 0, NumericType::Vec3, ComponentType::Int16).unwrap();
        assert_eq!(v, MetadataValue::from(vec![1i64, -2, 3]));
        let s = read_numeric_value(&data, 2, NumericType::Scalar, ComponentType::Int16).unwrap();
        assert_eq!(s, MetadataValue::from(-2i64));
    }

    #[test]
    fn booleans_are_lsb_first() {
        let data = [0b0000_0101, 0b1000_0000];
        let bits: Vec<bool> = (0..16).map(|i| read_boolean(&data, i).unwrap()).collect();
        assert!(bits[0] && !bits[1] && bits[2] && bits[15]);
        assert_eq!(bits.iter().filter(|b| **b).count(), 3);
        assert!(read_boolean(&data, 16).is_err());
    }

    #[test]
    fn strings_decode_utf8() {
        let data = "héllo".as_bytes();
        assert_eq!(read_string(data, 0, data.len()).unwrap(), "héllo");
        assert_eq!(read_string(data, 3, 3).unwrap(), "llo");
        assert!(read_string(data, 4, 10).is_err());
        assert_eq!(read_string(&[0x66, 0xff], 0, 2).unwrap(), "f\u{fffd}");
    }

    #[test]
    fn normalization_divides_by_max_positive_value() {
        let n = normalize(Number::Integer(127), ComponentType::Int8);
        assert_eq!(n, Number::Float(1.0));
        let n = normalize(Number::Integer(-128), ComponentType::Int8);
        assert_eq!(n, Number::Float(-1.0));
        let n = normalize(Number::Integer(-64), ComponentType::Int8);
        assert_eq!(n, Number::Float(-64.0 / 127.0));
        let n = normalize(Number::Integer(255), ComponentType::Uint8);
        assert_eq!(n, Number::Float(1.0));
        let n = normalize(Number::Integer(16384), ComponentType::Int16);
        assert_eq!(n, Number::Float(16384.0 / 32767.0));
        let n = normalize(Number::Float(0.25), ComponentType::Float32);
        assert_eq!(n, Number::Float(0.25));
    }
}
