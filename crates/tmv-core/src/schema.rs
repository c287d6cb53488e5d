//! # Schema and Property Table Model
//!
//! Typed representation of the JSON structures the validator consumes:
//! a metadata [`Schema`] (classes and enums), the [`ClassProperty`]
//! declarations inside a class, and the [`PropertyTable`] instances that
//! reference binary buffer views.
//!
//! ## Class properties are a tagged union
//!
//! In JSON a class property is one object whose legal fields depend on its
//! `type`. Here that object is [`ClassPropertyJson`], and it is converted
//! into a [`ClassProperty`] whose [`PropertyKind`] carries only the fields
//! that are legal for the kind: `componentType`, `normalized`, `offset`,
//! `scale`, `min` and `max` exist only on [`NumericProperty`]; `enumType`
//! exists only on [`PropertyKind::Enum`].
//!
//! ## Ordering
//!
//! Classes, enums and properties are kept in declaration order
//! ([`OrderedMap`]). Issues are reported in that order.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TmvError;
use crate::types::{ComponentType, ElementType, NumericType, OffsetType};
use crate::value::MetadataValue;

// ---------------------------------------------------------------------------
// OrderedMap
// ---------------------------------------------------------------------------

/// A string-keyed map that keeps JSON declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> OrderedMap<T> {
    /// An empty map.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Look up an entry by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up an entry by key for modification.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace an entry. New keys are appended.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key, value)),
        }
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<T: Serialize> Serialize for OrderedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct OrderedMapVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
    type Value = OrderedMap<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = OrderedMap::new();
        while let Some((key, value)) = access.next_entry::<String, T>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// A metadata schema: named classes and enums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Schema identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Application-specific version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Classes by ID.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub classes: OrderedMap<MetadataClass>,
    /// Enums by ID.
    #[serde(default, skip_serializing_if = "OrderedMap::is_empty")]
    pub enums: OrderedMap<MetadataEnum>,
}

impl Schema {
    /// Look up a class.
    pub fn class(&self, name: &str) -> Option<&MetadataClass> {
        self.classes.get(name)
    }

    /// Look up an enum.
    pub fn enumeration(&self, name: &str) -> Option<&MetadataEnum> {
        self.enums.get(name)
    }
}

/// A class: a set of typed properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataClass {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Property declarations by ID, in declaration order.
    #[serde(default)]
    pub properties: OrderedMap<ClassProperty>,
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

fn default_enum_value_type() -> ComponentType {
    ComponentType::Int16
}

/// An enum: named integer values stored as `valueType` integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataEnum {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Integer type the values are stored as.
    #[serde(default = "default_enum_value_type")]
    pub value_type: ComponentType,
    /// The named values.
    pub values: Vec<EnumValue>,
}

/// One `{name, value}` pair of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    /// The name reported for this value.
    pub name: String,
    /// The stored integer.
    pub value: i64,
}

impl MetadataEnum {
    /// Create an enum with the default value type.
    pub fn new<'a>(values: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        Self {
            name: None,
            description: None,
            value_type: default_enum_value_type(),
            values: values
                .into_iter()
                .map(|(name, value)| EnumValue {
                    name: name.to_string(),
                    value,
                })
                .collect(),
        }
    }

    /// Use a different storage type.
    pub fn with_value_type(mut self, value_type: ComponentType) -> Self {
        self.value_type = value_type;
        self
    }

    /// The name declared for a stored integer.
    pub fn name_of(&self, value: i128) -> Option<&str> {
        self.values
            .iter()
            .find(|v| v.value as i128 == value)
            .map(|v| v.name.as_str())
    }

    /// The stored integer declared for a name.
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.values.iter().find(|v| v.name == name).map(|v| v.value)
    }

    /// Whether a stored integer is one of the declared values.
    pub fn contains_value(&self, value: i128) -> bool {
        self.name_of(value).is_some()
    }
}

// ---------------------------------------------------------------------------
// Class properties
// ---------------------------------------------------------------------------

/// Whether a property holds single values, fixed-length arrays, or
/// variable-length arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayShape {
    /// One element per row.
    Single,
    /// Exactly `count` elements per row.
    Fixed(u64),
    /// A per-row element count given by the array offsets.
    Variable,
}

impl ArrayShape {
    /// Whether rows hold arrays.
    pub fn is_array(self) -> bool {
        !matches!(self, Self::Single)
    }

    /// Elements per row when the count is fixed (1 for single values).
    pub fn fixed_count(self) -> Option<u64> {
        match self {
            Self::Single => Some(1),
            Self::Fixed(n) => Some(n),
            Self::Variable => None,
        }
    }
}

/// The numeric part of a class property declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericProperty {
    /// Element layout.
    pub numeric_type: NumericType,
    /// Component kind.
    pub component_type: ComponentType,
    /// Whether integer components map to `[0, 1]` / `[-1, 1]`.
    pub normalized: bool,
    /// Added after normalization and scaling.
    pub offset: Option<MetadataValue>,
    /// Multiplied after normalization.
    pub scale: Option<MetadataValue>,
    /// Lower bound of final values.
    pub min: Option<MetadataValue>,
    /// Upper bound of final values.
    pub max: Option<MetadataValue>,
}

impl NumericProperty {
    /// A non-normalized property with no transforms or bounds.
    pub fn new(numeric_type: NumericType, component_type: ComponentType) -> Self {
        Self {
            numeric_type,
            component_type,
            normalized: false,
            offset: None,
            scale: None,
            min: None,
            max: None,
        }
    }
}

/// What a property stores.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// Bit-packed booleans.
    Boolean,
    /// UTF-8 strings addressed by string offsets.
    String,
    /// Integers naming values of the enum `enum_type`.
    Enum {
        /// ID of the enum in the schema.
        enum_type: String,
    },
    /// Scalars, vectors or matrices.
    Numeric(NumericProperty),
}

/// A class property declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ClassPropertyJson", into = "ClassPropertyJson")]
pub struct ClassProperty {
    /// Display name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// What the property stores.
    pub kind: PropertyKind,
    /// Array layout.
    pub array: ArrayShape,
    /// Whether every property table of the class must provide the property.
    pub required: bool,
    /// Raw value meaning "no data".
    pub no_data: Option<MetadataValue>,
    /// Value substituted for "no data".
    pub default: Option<MetadataValue>,
}

impl ClassProperty {
    fn with_kind(kind: PropertyKind) -> Self {
        Self {
            name: None,
            description: None,
            kind,
            array: ArrayShape::Single,
            required: false,
            no_data: None,
            default: None,
        }
    }

    /// A numeric property.
    pub fn numeric(numeric_type: NumericType, component_type: ComponentType) -> Self {
        Self::with_kind(PropertyKind::Numeric(NumericProperty::new(
            numeric_type,
            component_type,
        )))
    }

    /// A `SCALAR` property.
    pub fn scalar(component_type: ComponentType) -> Self {
        Self::numeric(NumericType::Scalar, component_type)
    }

    /// A `BOOLEAN` property.
    pub fn boolean() -> Self {
        Self::with_kind(PropertyKind::Boolean)
    }

    /// A `STRING` property.
    pub fn string() -> Self {
        Self::with_kind(PropertyKind::String)
    }

    /// An `ENUM` property.
    pub fn enumeration(enum_type: impl Into<String>) -> Self {
        Self::with_kind(PropertyKind::Enum {
            enum_type: enum_type.into(),
        })
    }

    /// Set the array layout.
    pub fn with_array(mut self, array: ArrayShape) -> Self {
        self.array = array;
        self
    }

    /// Set the noData value.
    pub fn with_no_data(mut self, no_data: impl Into<MetadataValue>) -> Self {
        self.no_data = Some(no_data.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: impl Into<MetadataValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Modify the numeric part. No effect on non-numeric properties.
    pub fn with_numeric(mut self, f: impl FnOnce(&mut NumericProperty)) -> Self {
        if let PropertyKind::Numeric(numeric) = &mut self.kind {
            f(numeric);
        }
        self
    }

    /// The JSON `type` tag.
    pub fn element_type(&self) -> ElementType {
        match &self.kind {
            PropertyKind::Boolean => ElementType::Boolean,
            PropertyKind::String => ElementType::String,
            PropertyKind::Enum { .. } => ElementType::Enum,
            PropertyKind::Numeric(n) => match n.numeric_type {
                NumericType::Scalar => ElementType::Scalar,
                NumericType::Vec2 => ElementType::Vec2,
                NumericType::Vec3 => ElementType::Vec3,
                NumericType::Vec4 => ElementType::Vec4,
                NumericType::Mat2 => ElementType::Mat2,
                NumericType::Mat3 => ElementType::Mat3,
                NumericType::Mat4 => ElementType::Mat4,
            },
        }
    }

    /// The numeric declaration, if numeric.
    pub fn numeric_property(&self) -> Option<&NumericProperty> {
        match &self.kind {
            PropertyKind::Numeric(n) => Some(n),
            _ => None,
        }
    }

    /// The enum ID, if an enum property.
    pub fn enum_type(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::Enum { enum_type } => Some(enum_type),
            _ => None,
        }
    }
}

/// JSON shape of a class property, before its fields are checked against
/// its `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPropertyJson {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Element type tag.
    #[serde(rename = "type")]
    pub element_type: ElementType,
    /// Component kind; numeric types only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<ComponentType>,
    /// Enum ID; `ENUM` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    /// Whether rows hold arrays.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,
    /// Fixed array length; absent for variable-length arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Whether integer components are normalized.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub normalized: bool,
    /// Offset transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<MetadataValue>,
    /// Scale transform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<MetadataValue>,
    /// Lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<MetadataValue>,
    /// Upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<MetadataValue>,
    /// Required flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// No-data sentinel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_data: Option<MetadataValue>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<MetadataValue>,
}

impl TryFrom<ClassPropertyJson> for ClassProperty {
    type Error = TmvError;

    fn try_from(json: ClassPropertyJson) -> Result<Self, Self::Error> {
        let kind = match json.element_type {
            ElementType::Boolean => PropertyKind::Boolean,
            ElementType::String => PropertyKind::String,
            ElementType::Enum => PropertyKind::Enum {
                enum_type: json.enum_type.ok_or_else(|| {
                    TmvError::InvalidDocument("ENUM property without enumType".to_string())
                })?,
            },
            numeric => {
                let numeric_type = numeric.numeric().ok_or_else(|| {
                    TmvError::InvalidDocument(format!("{numeric} is not numeric"))
                })?;
                let component_type = json.component_type.ok_or_else(|| {
                    TmvError::InvalidDocument(format!("{numeric} property without componentType"))
                })?;
                PropertyKind::Numeric(NumericProperty {
                    numeric_type,
                    component_type,
                    normalized: json.normalized,
                    offset: json.offset,
                    scale: json.scale,
                    min: json.min,
                    max: json.max,
                })
            }
        };
        let array = match (json.array, json.count) {
            (false, _) => ArrayShape::Single,
            (true, Some(count)) => ArrayShape::Fixed(count),
            (true, None) => ArrayShape::Variable,
        };
        Ok(Self {
            name: json.name,
            description: json.description,
            kind,
            array,
            required: json.required,
            no_data: json.no_data,
            default: json.default,
        })
    }
}

impl From<ClassProperty> for ClassPropertyJson {
    fn from(p: ClassProperty) -> Self {
        let element_type = p.element_type();
        let (array, count) = match p.array {
            ArrayShape::Single => (false, None),
            ArrayShape::Fixed(n) => (true, Some(n)),
            ArrayShape::Variable => (true, None),
        };
        let mut json = ClassPropertyJson {
            name: p.name,
            description: p.description,
            element_type,
            component_type: None,
            enum_type: None,
            array,
            count,
            normalized: false,
            offset: None,
            scale: None,
            min: None,
            max: None,
            required: p.required,
            no_data: p.no_data,
            default: p.default,
        };
        match p.kind {
            PropertyKind::Enum { enum_type } => json.enum_type = Some(enum_type),
            PropertyKind::Numeric(n) => {
                json.component_type = Some(n.component_type);
                json.normalized = n.normalized;
                json.offset = n.offset;
                json.scale = n.scale;
                json.min = n.min;
                json.max = n.max;
            }
            PropertyKind::Boolean | PropertyKind::String => {}
        }
        json
    }
}

// ---------------------------------------------------------------------------
// Property tables
// ---------------------------------------------------------------------------

/// A property table: `count` rows of the properties of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTable {
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ID of the class in the schema.
    pub class: String,
    /// Number of rows, shared by all properties.
    pub count: u64,
    /// The stored properties, in declaration order.
    #[serde(default)]
    pub properties: OrderedMap<PropertyTableProperty>,
}

/// Buffer view references and instance-level overrides of one stored
/// property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTableProperty {
    /// Buffer view holding the values.
    pub values: usize,
    /// Buffer view holding array offsets; variable-length arrays only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_offsets: Option<usize>,
    /// Buffer view holding string offsets; strings only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_offsets: Option<usize>,
    /// Integer type of the array offsets.
    #[serde(default)]
    pub array_offset_type: OffsetType,
    /// Integer type of the string offsets.
    #[serde(default)]
    pub string_offset_type: OffsetType,
    /// Overrides the class offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<MetadataValue>,
    /// Overrides the class scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<MetadataValue>,
    /// Claimed minimum of the final values in this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<MetadataValue>,
    /// Claimed maximum of the final values in this table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<MetadataValue>,
}

impl PropertyTableProperty {
    /// A property stored in a single buffer view with default offset types.
    pub fn new(values: usize) -> Self {
        Self {
            values,
            array_offsets: None,
            string_offsets: None,
            array_offset_type: OffsetType::default(),
            string_offset_type: OffsetType::default(),
            offset: None,
            scale: None,
            min: None,
            max: None,
        }
    }
}
