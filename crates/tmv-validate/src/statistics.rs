//! # Component-wise Statistics
//!
//! [`ValueStatistics`] accumulates the minimum and maximum of a sequence of
//! metadata values position by position: component 0 of every sample is
//! compared with component 0 of the others, and so on, recursively through
//! arrays of vectors. The result has the shape of the samples.
//!
//! The comparison helpers match a declared `min`/`max` against the
//! accumulated extremes using the broadcasting rule of
//! [`tmv_binary::transform`]. Every `tolerance` is relative and only absorbs
//! rounding: see [`rounding_tolerance`]. Two integers always compare exactly.

use std::cmp::Ordering;

use tmv_binary::transform::broadcast_for_each;
use tmv_core::{ComponentType, MetadataValue, Number};

/// Relative rounding error of final values computed in `f64`.
pub const FLOAT64_ROUNDING: f64 = 4.0 * f64::EPSILON;

/// Relative tolerance for comparing final values of a `component_type`
/// property with JSON declarations: one `f32` ULP for `FLOAT32` storage,
/// a few `f64` ULPs otherwise.
pub fn rounding_tolerance(component_type: ComponentType) -> f64 {
    match component_type {
        ComponentType::Float32 => f64::from(f32::EPSILON),
        _ => FLOAT64_ROUNDING,
    }
}

/// Running component-wise minimum and maximum.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueStatistics {
    min: Option<MetadataValue>,
    max: Option<MetadataValue>,
    samples: usize,
}

impl ValueStatistics {
    /// No samples yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample into the extremes.
    pub fn add(&mut self, sample: &MetadataValue) {
        self.samples += 1;
        match &mut self.min {
            Some(min) => combine(min, sample, Number::min),
            None => self.min = Some(sample.clone()),
        }
        match &mut self.max {
            Some(max) => combine(max, sample, Number::max),
            None => self.max = Some(sample.clone()),
        }
    }

    /// Component-wise minimum, `None` before the first sample.
    pub fn min(&self) -> Option<&MetadataValue> {
        self.min.as_ref()
    }

    /// Component-wise maximum, `None` before the first sample.
    pub fn max(&self) -> Option<&MetadataValue> {
        self.max.as_ref()
    }

    /// Number of samples folded in.
    pub fn sample_count(&self) -> usize {
        self.samples
    }

    /// Whether no samples were folded in.
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

fn combine(acc: &mut MetadataValue, sample: &MetadataValue, keep: fn(Number, Number) -> Number) {
    match (acc, sample) {
        (MetadataValue::Number(a), MetadataValue::Number(b)) => *a = keep(*a, *b),
        (MetadataValue::Array(acc_items), MetadataValue::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                match acc_items.get_mut(i) {
                    Some(a) => combine(a, item, keep),
                    None => acc_items.push(item.clone()),
                }
            }
        }
        _ => {}
    }
}

/// Fold the outer array levels of `value` until it is no deeper than
/// `depth`.
fn collapse(value: &MetadataValue, depth: usize, keep: fn(Number, Number) -> Number) -> MetadataValue {
    if value.depth() <= depth {
        return value.clone();
    }
    let MetadataValue::Array(items) = value else {
        return value.clone();
    };
    let mut items = items.iter();
    let Some(first) = items.next() else {
        return value.clone();
    };
    let mut acc = first.clone();
    for item in items {
        combine(&mut acc, item, keep);
    }
    collapse(&acc, depth, keep)
}

/// A component that contradicts a declared value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discrepancy {
    /// The value found in the data.
    pub actual: Number,
    /// The declared value it was compared with.
    pub declared: Number,
}

/// First component of `computed_min` that lies strictly below
/// `declared_min`.
pub fn find_below(
    computed_min: &MetadataValue,
    declared_min: &MetadataValue,
    tolerance: f64,
) -> Option<Discrepancy> {
    find_violation(computed_min, declared_min, tolerance, Ordering::Less)
}

/// First component of `computed_max` that lies strictly above
/// `declared_max`.
pub fn find_above(
    computed_max: &MetadataValue,
    declared_max: &MetadataValue,
    tolerance: f64,
) -> Option<Discrepancy> {
    find_violation(computed_max, declared_max, tolerance, Ordering::Greater)
}

fn find_violation(
    computed: &MetadataValue,
    declared: &MetadataValue,
    tolerance: f64,
    violating: Ordering,
) -> Option<Discrepancy> {
    let mut found = None;
    broadcast_for_each(computed, declared, &mut |actual, bound| {
        if found.is_none()
            && actual.compare(bound) == Some(violating)
            && !actual.approx_eq(bound, tolerance)
        {
            found = Some(Discrepancy {
                actual,
                declared: bound,
            });
        }
    });
    found
}

/// First component where a declared minimum differs from the computed one.
///
/// A declaration shallower than the samples (a per-element minimum for
/// array values) is compared with the minimum over all elements.
pub fn find_min_mismatch(
    computed_min: &MetadataValue,
    declared_min: &MetadataValue,
    tolerance: f64,
) -> Option<Discrepancy> {
    let computed = collapse(computed_min, declared_min.depth(), Number::min);
    find_mismatch(&computed, declared_min, tolerance)
}

/// First component where a declared maximum differs from the computed one.
pub fn find_max_mismatch(
    computed_max: &MetadataValue,
    declared_max: &MetadataValue,
    tolerance: f64,
) -> Option<Discrepancy> {
    let computed = collapse(computed_max, declared_max.depth(), Number::max);
    find_mismatch(&computed, declared_max, tolerance)
}

fn find_mismatch(
    computed: &MetadataValue,
    declared: &MetadataValue,
    tolerance: f64,
) -> Option<Discrepancy> {
    let mut found = None;
    broadcast_for_each(computed, declared, &mut |actual, expected| {
        if found.is_none() && !actual.approx_eq(expected, tolerance) {
            found = Some(Discrepancy {
                actual,
                declared: expected,
            });
        }
    });
    found
}
