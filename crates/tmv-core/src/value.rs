//! # Metadata Values
//!
//! The logical value model shared by the reader, the materializer and the
//! validator. A [`MetadataValue`] is a small tree: booleans, numbers and
//! strings are leaves, arrays are inner nodes. Vectors and matrices are
//! arrays of numbers; arrays of vectors are arrays of arrays.
//!
//! [`Number`] keeps integers as `i128` so that every `INT64` and `UINT64`
//! value survives without rounding. Arithmetic that leaves the integer
//! domain (normalization, offset, scale) produces [`Number::Float`].
//!
//! Declared `min`, `max`, `offset`, `scale`, `noData` and `default`
//! values arrive as JSON and are converted with [`MetadataValue::from_json`].

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TmvError;

// ---------------------------------------------------------------------------
// Number
// ---------------------------------------------------------------------------

/// A single numeric component.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    /// An exact integer. Wide enough for the full `INT64` and `UINT64` ranges.
    Integer(i128),
    /// A floating-point value.
    Float(f64),
}

impl Number {
    /// The value as a double. Integers beyond 2^53 lose precision here.
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Float(f) => f,
        }
    }

    /// Whether this is an exact integer.
    pub fn is_integer(self) -> bool {
        matches!(self, Self::Integer(_))
    }

    /// Compare two numbers. Two integers compare exactly; anything
    /// involving a float compares as doubles. `None` only for NaN.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(&b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }

    /// Equality with a relative tolerance when a float is involved.
    ///
    /// Two integers must be identical. Otherwise the values are equal when
    /// `|a - b| <= epsilon * max(1, |a|, |b|)`.
    pub fn approx_eq(self, other: Number, epsilon: f64) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            _ => {
                let a = self.as_f64();
                let b = other.as_f64();
                if a == b {
                    return true;
                }
                let scale = 1.0_f64.max(a.abs()).max(b.abs());
                (a - b).abs() <= epsilon * scale
            }
        }
    }

    /// Whether this is a floating-point NaN.
    pub fn is_nan(self) -> bool {
        matches!(self, Self::Float(f) if f.is_nan())
    }

    /// The smaller of two numbers, the first one on ties. A NaN loses to
    /// any other number.
    pub fn min(self, other: Number) -> Number {
        match other.compare(self) {
            Some(Ordering::Less) => other,
            None if self.is_nan() => other,
            _ => self,
        }
    }

    /// The larger of two numbers, the first one on ties. A NaN loses to
    /// any other number.
    pub fn max(self, other: Number) -> Number {
        match other.compare(self) {
            Some(Ordering::Greater) => other,
            None if self.is_nan() => other,
            _ => self,
        }
    }

    /// Convert a JSON number. Integral JSON numbers stay exact.
    pub fn from_json(n: &serde_json::Number) -> Number {
        if let Some(i) = n.as_i64() {
            Self::Integer(i as i128)
        } else if let Some(u) = n.as_u64() {
            Self::Integer(u as i128)
        } else {
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }

    /// Convert to JSON. Non-finite floats become `null`.
    pub fn to_json(self) -> Value {
        match self {
            Self::Integer(i) => {
                if let Ok(v) = i64::try_from(i) {
                    Value::from(v)
                } else if let Ok(v) = u64::try_from(i) {
                    Value::from(v)
                } else {
                    Self::Float(i as f64).to_json()
                }
            }
            Self::Float(f) => serde_json::Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.compare(*other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Self::Integer(v as i128)
    }
}

impl From<u64> for Number {
    fn from(v: u64) -> Self {
        Self::Integer(v as i128)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

// ---------------------------------------------------------------------------
// MetadataValue
// ---------------------------------------------------------------------------

/// A logical metadata value: the value of one property in one row, or one
/// declared schema value (`min`, `noData`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum MetadataValue {
    /// A boolean.
    Boolean(bool),
    /// A number.
    Number(Number),
    /// A string, or the resolved name of an enum value.
    String(String),
    /// A vector, matrix, or array value.
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    /// Convert a JSON value. `null` and objects are not metadata values.
    pub fn from_json(value: &Value) -> Result<Self, TmvError> {
        match value {
            Value::Bool(b) => Ok(Self::Boolean(*b)),
            Value::Number(n) => Ok(Self::Number(Number::from_json(n))),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Null => Err(TmvError::InvalidValue("null".to_string())),
            Value::Object(_) => Err(TmvError::InvalidValue(
                "objects are not metadata values".to_string(),
            )),
        }
    }

    /// Convert to JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Number(n) => n.to_json(),
            Self::String(s) => Value::String(s.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    /// The number, if this is a numeric leaf.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The elements, if this is an array.
    pub fn as_array(&self) -> Option<&[MetadataValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// The string, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Nesting depth: 0 for leaves, 1 for a flat array, and so on.
    pub fn depth(&self) -> usize {
        match self {
            Self::Array(items) => 1 + items.iter().map(Self::depth).max().unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether every leaf of this tree is a number.
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Number(_) => true,
            Self::Array(items) => items.iter().all(Self::is_numeric),
            _ => false,
        }
    }

    /// Apply `f` to every numeric leaf, keeping the shape.
    pub fn map_numbers(&self, f: &impl Fn(Number) -> Number) -> MetadataValue {
        match self {
            Self::Number(n) => Self::Number(f(*n)),
            Self::Array(items) => Self::Array(items.iter().map(|v| v.map_numbers(f)).collect()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl TryFrom<Value> for MetadataValue {
    type Error = TmvError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

impl From<MetadataValue> for Value {
    fn from(value: MetadataValue) -> Self {
        value.to_json()
    }
}

impl From<Number> for MetadataValue {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<u64> for MetadataValue {
    fn from(v: u64) -> Self {
        Self::Number(Number::from(v))
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        Self::Number(Number::Float(v))
    }
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<MetadataValue>> From<Vec<T>> for MetadataValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}
