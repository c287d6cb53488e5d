//! # Offset, Scale and Broadcasting
//!
//! Declared `offset`, `scale`, `min` and `max` values are matched against a
//! metadata value with one broadcasting rule:
//!
//! - a number applies to every component beneath it;
//! - an array of the same depth as the value applies position-wise;
//! - an array of lower depth applies to each element of the value.
//!
//! The last case is how a per-element declaration (a `VEC3` offset, say)
//! applies to every element of an array property.

use tmv_core::{MetadataValue, Number};

/// Apply `f(component, parameter)` to every component of `value` that has a
/// matching parameter component. Components without one are kept.
pub fn broadcast_map(
    value: &MetadataValue,
    parameter: &MetadataValue,
    f: &impl Fn(Number, Number) -> Number,
) -> MetadataValue {
    match (value, parameter) {
        (_, MetadataValue::Number(p)) => value.map_numbers(&|n| f(n, *p)),
        (MetadataValue::Array(items), MetadataValue::Array(params)) => {
            if parameter.depth() < value.depth() {
                MetadataValue::Array(items.iter().map(|v| broadcast_map(v, parameter, f)).collect())
            } else {
                MetadataValue::Array(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| match params.get(i) {
                            Some(p) => broadcast_map(v, p, f),
                            None => v.clone(),
                        })
                        .collect(),
                )
            }
        }
        _ => value.clone(),
    }
}

/// Visit every `(component, parameter)` pair under the broadcasting rule.
pub fn broadcast_for_each(
    value: &MetadataValue,
    parameter: &MetadataValue,
    visit: &mut impl FnMut(Number, Number),
) {
    match (value, parameter) {
        (MetadataValue::Number(n), MetadataValue::Number(p)) => visit(*n, *p),
        (MetadataValue::Array(items), MetadataValue::Number(_)) => {
            for item in items {
                broadcast_for_each(item, parameter, visit);
            }
        }
        (MetadataValue::Array(items), MetadataValue::Array(params)) => {
            if parameter.depth() < value.depth() {
                for item in items {
                    broadcast_for_each(item, parameter, visit);
                }
            } else {
                for (item, p) in items.iter().zip(params) {
                    broadcast_for_each(item, p, visit);
                }
            }
        }
        _ => {}
    }
}

/// `value * scale + offset`, each optional, with broadcasting.
pub fn apply_scale_offset(
    value: &MetadataValue,
    scale: Option<&MetadataValue>,
    offset: Option<&MetadataValue>,
) -> MetadataValue {
    let scaled = match scale {
        Some(scale) => broadcast_map(value, scale, &multiply),
        None => value.clone(),
    };
    match offset {
        Some(offset) => broadcast_map(&scaled, offset, &add),
        None => scaled,
    }
}

fn multiply(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => match x.checked_mul(y) {
            Some(v) => Number::Integer(v),
            None => Number::Float(a.as_f64() * b.as_f64()),
        },
        _ => Number::Float(a.as_f64() * b.as_f64()),
    }
}

fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Integer(x), Number::Integer(y)) => match x.checked_add(y) {
            Some(v) => Number::Integer(v),
            None => Number::Float(a.as_f64() + b.as_f64()),
        },
        _ => Number::Float(a.as_f64() + b.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> MetadataValue {
        MetadataValue::from_json(&json).unwrap()
    }

    #[test]
    fn scalar_offset_applies_everywhere() {
        let value = v(json!([[1, 2], [3, 4]]));
        let out = apply_scale_offset(&value, None, Some(&v(json!(100))));
        assert_eq!(out, v(json!([[101, 102], [103, 104]])));
    }

    #[test]
    fn same_depth_parameter_is_positional() {
        let out = apply_scale_offset(
            &v(json!([1, 2, 3])),
            Some(&v(json!([2, 3, 4]))),
            Some(&v(json!([0, 0, 1]))),
        );
        assert_eq!(out, v(json!([2, 6, 13])));
    }

    #[test]
    fn lower_depth_parameter_applies_to_each_element() {
        let out = apply_scale_offset(
            &v(json!([[1, 1], [2, 2], [3, 3]])),
            None,
            Some(&v(json!([10, 20]))),
        );
        assert_eq!(out, v(json!([[11, 21], [12, 22], [13, 23]])));
    }

    #[test]
    fn integer_arithmetic_stays_exact() {
        let big = MetadataValue::Number(Number::Integer(i64::MAX as i128));
        let out = apply_scale_offset(&big, None, Some(&MetadataValue::from(1i64)));
        assert_eq!(out, MetadataValue::Number(Number::Integer(i64::MAX as i128 + 1)));
    }

    #[test]
    fn float_scale_produces_floats() {
        let scale = MetadataValue::from(0.5);
        let out = apply_scale_offset(&MetadataValue::from(3i64), Some(&scale), None);
        assert!(matches!(out, MetadataValue::Number(Number::Float(f)) if f == 1.5));
    }

    #[test]
    fn for_each_visits_broadcast_pairs() {
        let mut pairs = Vec::new();
        broadcast_for_each(
            &v(json!([[1, 2], [3, 4]])),
            &v(json!([0, 9])),
            &mut |a, b| pairs.push((a.as_f64(), b.as_f64())),
        );
        assert_eq!(pairs, vec![(1.0, 0.0), (2.0, 9.0), (3.0, 0.0), (4.0, 9.0)]);
    }
}
