//! # Numeric Type Catalog
//!
//! Static lookups for the type tags used by metadata schemas:
//!
//! - [`ComponentType`]: the numeric kind of a single component
//!   (`INT8` … `FLOAT64`) with its byte width, signedness and float-ness.
//! - [`ElementType`]: the `type` tag of a class property
//!   (`SCALAR`, `VEC2..4`, `MAT2..4`, `BOOLEAN`, `STRING`, `ENUM`).
//! - [`NumericType`]: the numeric subset of [`ElementType`], which carries
//!   the component count.
//! - [`OffsetType`]: the unsigned integer kinds allowed for array and
//!   string offset buffers.
//!
//! Tags are parsed once at the JSON boundary. Past that point an
//! unrecognized tag cannot exist, so every lookup here is total.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TmvError;

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

/// Numeric kind of a single component of a metadata value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
    /// IEEE-754 single precision float.
    Float32,
    /// IEEE-754 double precision float.
    Float64,
}

impl ComponentType {
    /// All component types in catalog order.
    pub fn all() -> &'static [ComponentType] {
        &[
            Self::Int8,
            Self::Uint8,
            Self::Int16,
            Self::Uint16,
            Self::Int32,
            Self::Uint32,
            Self::Int64,
            Self::Uint64,
            Self::Float32,
            Self::Float64,
        ]
    }

    /// Encoded width of one component in bytes. This is also the required
    /// alignment of any buffer view read as this component type.
    pub fn byte_size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Whether the type can represent negative values.
    pub fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }

    /// Whether the type is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Whether the type is an integer type.
    pub fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Largest representable value of an integer type, used as the divisor
    /// for normalization. `None` for float types.
    pub fn max_integer(self) -> Option<i128> {
        match self {
            Self::Int8 => Some(i8::MAX as i128),
            Self::Uint8 => Some(u8::MAX as i128),
            Self::Int16 => Some(i16::MAX as i128),
            Self::Uint16 => Some(u16::MAX as i128),
            Self::Int32 => Some(i32::MAX as i128),
            Self::Uint32 => Some(u32::MAX as i128),
            Self::Int64 => Some(i64::MAX as i128),
            Self::Uint64 => Some(u64::MAX as i128),
            Self::Float32 | Self::Float64 => None,
        }
    }

    /// Smallest representable value of an integer type. `None` for floats.
    pub fn min_integer(self) -> Option<i128> {
        match self {
            Self::Int8 => Some(i8::MIN as i128),
            Self::Int16 => Some(i16::MIN as i128),
            Self::Int32 => Some(i32::MIN as i128),
            Self::Int64 => Some(i64::MIN as i128),
            Self::Uint8 | Self::Uint16 | Self::Uint32 | Self::Uint64 => Some(0),
            Self::Float32 | Self::Float64 => None,
        }
    }

    /// The JSON tag of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "INT8",
            Self::Uint8 => "UINT8",
            Self::Int16 => "INT16",
            Self::Uint16 => "UINT16",
            Self::Int32 => "INT32",
            Self::Uint32 => "UINT32",
            Self::Int64 => "INT64",
            Self::Uint64 => "UINT64",
            Self::Float32 => "FLOAT32",
            Self::Float64 => "FLOAT64",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = TmvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TmvError::UnknownTag {
                kind: "componentType",
                tag: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// NumericType
// ---------------------------------------------------------------------------

/// Numeric element layouts: a scalar, a vector or a square matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NumericType {
    /// One component.
    Scalar,
    /// Two components.
    Vec2,
    /// Three components.
    Vec3,
    /// Four components.
    Vec4,
    /// 2x2 matrix, four components.
    Mat2,
    /// 3x3 matrix, nine components.
    Mat3,
    /// 4x4 matrix, sixteen components.
    Mat4,
}

impl NumericType {
    /// Number of components in one element of this type.
    pub fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat2 => 4,
            Self::Mat3 => 9,
            Self::Mat4 => 16,
        }
    }

    /// Whether values of this type are a single number rather than a
    /// sequence of components.
    pub fn is_scalar(self) -> bool {
        self == Self::Scalar
    }
}

// ---------------------------------------------------------------------------
// ElementType
// ---------------------------------------------------------------------------

/// The `type` tag of a class property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ElementType {
    /// `SCALAR`
    Scalar,
    /// `VEC2`
    Vec2,
    /// `VEC3`
    Vec3,
    /// `VEC4`
    Vec4,
    /// `MAT2`
    Mat2,
    /// `MAT3`
    Mat3,
    /// `MAT4`
    Mat4,
    /// `BOOLEAN`, stored bit-packed.
    Boolean,
    /// `STRING`, stored as UTF-8 with string offsets.
    String,
    /// `ENUM`, stored as integers of the enum's value type.
    Enum,
}

impl ElementType {
    /// All element types in catalog order.
    pub fn all() -> &'static [ElementType] {
        &[
            Self::Scalar,
            Self::Vec2,
            Self::Vec3,
            Self::Vec4,
            Self::Mat2,
            Self::Mat3,
            Self::Mat4,
            Self::Boolean,
            Self::String,
            Self::Enum,
        ]
    }

    /// The numeric layout, if this is a numeric element type.
    pub fn numeric(self) -> Option<NumericType> {
        match self {
            Self::Scalar => Some(NumericType::Scalar),
            Self::Vec2 => Some(NumericType::Vec2),
            Self::Vec3 => Some(NumericType::Vec3),
            Self::Vec4 => Some(NumericType::Vec4),
            Self::Mat2 => Some(NumericType::Mat2),
            Self::Mat3 => Some(NumericType::Mat3),
            Self::Mat4 => Some(NumericType::Mat4),
            Self::Boolean | Self::String | Self::Enum => None,
        }
    }

    /// Number of components of one element; 1 for non-numeric types.
    pub fn component_count(self) -> usize {
        self.numeric().map_or(1, NumericType::component_count)
    }

    /// The JSON tag of this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "SCALAR",
            Self::Vec2 => "VEC2",
            Self::Vec3 => "VEC3",
            Self::Vec4 => "VEC4",
            Self::Mat2 => "MAT2",
            Self::Mat3 => "MAT3",
            Self::Mat4 => "MAT4",
            Self::Boolean => "BOOLEAN",
            Self::String => "STRING",
            Self::Enum => "ENUM",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = TmvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| TmvError::UnknownTag {
                kind: "type",
                tag: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// OffsetType
// ---------------------------------------------------------------------------

/// Integer kind of an `arrayOffsets` or `stringOffsets` buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OffsetType {
    /// 8-bit offsets.
    Uint8,
    /// 16-bit offsets.
    Uint16,
    /// 32-bit offsets (the default).
    #[default]
    Uint32,
    /// 64-bit offsets.
    Uint64,
}

impl OffsetType {
    /// Width of one offset in bytes.
    pub fn byte_size(self) -> usize {
        self.component_type().byte_size()
    }

    /// The equivalent component type.
    pub fn component_type(self) -> ComponentType {
        match self {
            Self::Uint8 => ComponentType::Uint8,
            Self::Uint16 => ComponentType::Uint16,
            Self::Uint32 => ComponentType::Uint32,
            Self::Uint64 => ComponentType::Uint64,
        }
    }

    /// The JSON tag of this type.
    pub fn as_str(self) -> &'static str {
        self.component_type().as_str()
    }
}

impl fmt::Display for OffsetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_type_widths() {
        let widths: Vec<usize> = ComponentType::all().iter().map(|t| t.byte_size()).collect();
        assert_eq!(widths, vec![1, 1, 2, 2, 4, 4, 8, 8, 4, 8]);
    }

    #[test]
    fn component_type_signedness() {
        assert!(ComponentType::Int8.is_signed());
        assert!(!ComponentType::Uint64.is_signed());
        assert!(ComponentType::Float32.is_signed());
        assert!(ComponentType::Float64.is_float());
        assert!(ComponentType::Uint16.is_integer());
    }

    #[test]
    fn component_type_integer_bounds() {
        assert_eq!(ComponentType::Int16.max_integer(), Some(32767));
        assert_eq!(ComponentType::Int16.min_integer(), Some(-32768));
        assert_eq!(ComponentType::Uint64.max_integer(), Some(u64::MAX as i128));
        assert_eq!(ComponentType::Float32.max_integer(), None);
    }

    #[test]
    fn component_counts() {
        let counts: Vec<usize> = [
            ElementType::Scalar,
            ElementType::Vec2,
            ElementType::Vec3,
            ElementType::Vec4,
            ElementType::Mat2,
            ElementType::Mat3,
            ElementType::Mat4,
        ]
        .iter()
        .map(|t| t.component_count())
        .collect();
        assert_eq!(counts, vec![1, 2, 3, 4, 4, 9, 16]);
        assert_eq!(ElementType::String.component_count(), 1);
    }

    #[test]
    fn tags_parse_and_print() {
        for t in ComponentType::all() {
            assert_eq!(t.as_str().parse::<ComponentType>().unwrap(), *t);
        }
        for t in ElementType::all() {
            assert_eq!(t.as_str().parse::<ElementType>().unwrap(), *t);
        }
        assert!("INT128".parse::<ComponentType>().is_err());
        assert!("VEC5".parse::<ElementType>().is_err());
    }

    #[test]
    fn serde_tags_match_catalog() {
        let json = serde_json::to_string(&ComponentType::Uint16).unwrap();
        assert_eq!(json, "\"UINT16\"");
        let parsed: ElementType = serde_json::from_str("\"MAT3\"").unwrap();
        assert_eq!(parsed, ElementType::Mat3);
        let offset: OffsetType = serde_json::from_str("\"UINT8\"").unwrap();
        assert_eq!(offset.byte_size(), 1);
    }

    #[test]
    fn offset_type_defaults_to_uint32() {
        assert_eq!(OffsetType::default(), OffsetType::Uint32);
        assert_eq!(OffsetType::default().byte_size(), 4);
    }
}
