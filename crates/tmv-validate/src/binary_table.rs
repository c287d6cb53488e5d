//! # Binary Property Table Validator
//!
//! Checks that the declarations of a property table and the bytes behind
//! it agree. For every property of the class, in declaration order:
//!
//! 1. Alignment of each referenced buffer view.
//! 2. Length of the `values` view for fixed-size properties.
//! 3. Length and monotonicity of `arrayOffsets`/`stringOffsets`, and the
//!    length of `values` implied by the last offset.
//! 4. Membership of every stored enum integer in its enum.
//! 5. Declared `min`/`max` against the component-wise extremes of the
//!    final values, and table-level `min`/`max` for equality with them.
//!
//! Checks 1 to 3 guard the reads done by 4 and 5: once a view fails one of
//! them, nothing is read through it for that property. Sibling properties
//! are validated regardless.
//!
//! Findings are appended to the [`ValidationContext`]; nothing here returns
//! an error or panics on malformed input.

use tmv_binary::offsets::{first_decrease, read_offsets};
use tmv_binary::{BinaryPropertyTable, BufferView, PropertyModel, ReadError};
use tmv_core::{
    ArrayShape, ClassProperty, IssueType, MetadataEnum, MetadataValue, Number, NumericProperty,
    OffsetType, PropertyKind, PropertyTableProperty, ValidationContext, ValidationIssue,
};

use crate::config::ValidatorConfig;
use crate::statistics::{
    find_above, find_below, find_max_mismatch, find_min_mismatch, rounding_tolerance, Discrepancy,
    ValueStatistics,
};

/// Validates the binary data of property tables.
#[derive(Debug, Clone, Default)]
pub struct BinaryPropertyTableValidator {
    config: ValidatorConfig,
}

impl BinaryPropertyTableValidator {
    /// A validator with the given configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// The configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate every property of `table`. Issue paths are rooted at
    /// `path`, the location of the property table.
    ///
    /// Returns whether no issues were added.
    pub fn validate(
        &self,
        path: &str,
        table: &BinaryPropertyTable,
        context: &mut ValidationContext,
    ) -> bool {
        let before = context.issue_count();
        let Some(class) = table.class() else {
            tracing::warn!(path, class = table.class_name(), "class not found, table skipped");
            return true;
        };
        tracing::debug!(
            path,
            class = table.class_name(),
            count = table.count(),
            "validating property table"
        );
        for (name, class_property) in class.properties.iter() {
            let Some(table_property) = table.table_property(name) else {
                continue;
            };
            let check = PropertyCheck {
                config: &self.config,
                table,
                name,
                path: format!("{path}/properties/{name}"),
                class_property,
                table_property,
            };
            check.run(context);
        }
        context.issue_count() == before
    }
}

/// Validate `table` with the given configuration.
pub fn validate_binary_property_table(
    path: &str,
    table: &BinaryPropertyTable,
    config: &ValidatorConfig,
    context: &mut ValidationContext,
) -> bool {
    BinaryPropertyTableValidator::new(config.clone()).validate(path, table, context)
}

// ---------------------------------------------------------------------------
// Per-property checks
// ---------------------------------------------------------------------------

struct PropertyCheck<'a> {
    config: &'a ValidatorConfig,
    table: &'a BinaryPropertyTable,
    name: &'a str,
    path: String,
    class_property: &'a ClassProperty,
    table_property: &'a PropertyTableProperty,
}

/// Which buffer views of a property can still be read through.
#[derive(Debug, Clone, Copy)]
struct Readable {
    values: bool,
    array_offsets: bool,
    string_offsets: bool,
}

impl Readable {
    fn all(self, class_property: &ClassProperty) -> bool {
        self.values
            && (class_property.array != ArrayShape::Variable || self.array_offsets)
            && (class_property.kind != PropertyKind::String || self.string_offsets)
    }
}

impl<'a> PropertyCheck<'a> {
    fn run(&self, context: &mut ValidationContext) {
        tracing::debug!(property = self.name, "validating property");

        let enumeration = match self.class_property.enum_type() {
            Some(enum_type) => match self.table.enumeration(enum_type) {
                Some(e) => Some(e),
                None => {
                    tracing::warn!(
                        property = self.name,
                        enum_type,
                        "enum not found, property skipped"
                    );
                    return;
                }
            },
            None => None,
        };

        let Some(values_view) = self.view(self.table_property.values, "values") else {
            return;
        };
        let array_offsets = match self.class_property.array {
            ArrayShape::Variable => {
                let view = self.indexed_view(self.table_property.array_offsets, "arrayOffsets");
                match view {
                    Some(view) => Some(view),
                    None => return,
                }
            }
            _ => None,
        };
        let string_offsets = match self.class_property.kind {
            PropertyKind::String => {
                let view = self.indexed_view(self.table_property.string_offsets, "stringOffsets");
                match view {
                    Some(view) => Some(view),
                    None => return,
                }
            }
            _ => None,
        };

        // 1. Alignment
        let values_alignment = self.values_alignment(enumeration);
        let mut readable = Readable {
            values: self.check_alignment(context, "values", values_view, values_alignment),
            array_offsets: true,
            string_offsets: true,
        };
        if let Some((_, view)) = array_offsets {
            let alignment = self.table_property.array_offset_type.byte_size();
            readable.array_offsets = self.check_alignment(context, "arrayOffsets", view, alignment);
        }
        if let Some((_, view)) = string_offsets {
            let alignment = self.table_property.string_offset_type.byte_size();
            readable.string_offsets =
                self.check_alignment(context, "stringOffsets", view, alignment);
        }

        // 2. Length of fixed-size values
        let is_string = self.class_property.kind == PropertyKind::String;
        let element_size = self.element_size(enumeration);
        let mut element_count = self
            .class_property
            .array
            .fixed_count()
            .and_then(|n| self.table.count().checked_mul(n));
        if readable.values && !is_string && self.class_property.array.fixed_count().is_some() {
            let expected = element_count.and_then(|n| values_byte_length(element_size, n));
            readable.values = self.check_values_length(context, values_view, expected, None);
        }

        // 3. Offsets
        if let Some((index, view)) = array_offsets {
            if readable.array_offsets {
                let offset_type = self.table_property.array_offset_type;
                let count = self.table.count();
                match self.check_offsets(context, "arrayOffsets", index, view, offset_type, count) {
                    Some(total) => element_count = Some(total),
                    None => readable.array_offsets = false,
                }
            }
            if readable.values && readable.array_offsets && !is_string {
                let expected = element_count.and_then(|n| values_byte_length(element_size, n));
                readable.values =
                    self.check_values_length(context, values_view, expected, Some("arrayOffsets"));
            }
        }
        if let Some((index, view)) = string_offsets {
            let strings =
                element_count.filter(|_| readable.array_offsets && readable.string_offsets);
            match strings {
                Some(strings) => {
                    let offset_type = self.table_property.string_offset_type;
                    let checked = self.check_offsets(
                        context,
                        "stringOffsets",
                        index,
                        view,
                        offset_type,
                        strings,
                    );
                    match checked {
                        Some(total_bytes) if readable.values => {
                            readable.values = self.check_values_length(
                                context,
                                values_view,
                                Some(total_bytes),
                                Some("stringOffsets"),
                            );
                        }
                        Some(_) => {}
                        None => readable.string_offsets = false,
                    }
                }
                None => readable.string_offsets = false,
            }
        }

        if !self.config.validate_values {
            return;
        }
        if !readable.all(self.class_property) {
            tracing::debug!(property = self.name, "value checks skipped after structural issues");
            return;
        }

        let model = match PropertyModel::new(self.table, self.name) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(property = self.name, error = %e, "value checks skipped");
                return;
            }
        };

        let outcome = match (&self.class_property.kind, enumeration) {
            // 4. Enum membership
            (PropertyKind::Enum { enum_type }, Some(enumeration)) => {
                self.check_enum_values(context, &model, enum_type, enumeration)
            }
            // 5. Ranges and statistics
            (PropertyKind::Numeric(numeric), _) => self.check_statistics(context, &model, numeric),
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            tracing::warn!(property = self.name, error = %e, "value checks aborted");
        }
    }

    fn view(&self, index: usize, which: &str) -> Option<&'a BufferView> {
        let view = self.table.buffer_view(index);
        if view.is_none() {
            tracing::warn!(
                property = self.name,
                which,
                index,
                "buffer view not found, property skipped"
            );
        }
        view
    }

    fn indexed_view(&self, index: Option<usize>, which: &str) -> Option<(usize, &'a BufferView)> {
        let Some(index) = index else {
            tracing::warn!(property = self.name, which, "buffer view missing, property skipped");
            return None;
        };
        self.view(index, which).map(|view| (index, view))
    }

    fn issue(&self, context: &mut ValidationContext, issue_type: IssueType, message: String) {
        context.add_issue(ValidationIssue::error(issue_type, self.path.clone(), message));
    }

    fn values_alignment(&self, enumeration: Option<&MetadataEnum>) -> usize {
        match &self.class_property.kind {
            PropertyKind::Numeric(n) => n.component_type.byte_size(),
            PropertyKind::Enum { .. } => enumeration.map_or(1, |e| e.value_type.byte_size()),
            PropertyKind::Boolean | PropertyKind::String => 1,
        }
    }

    /// Bytes per element; bits for booleans are handled by
    /// [`values_byte_length`].
    fn element_size(&self, enumeration: Option<&MetadataEnum>) -> ElementSize {
        match &self.class_property.kind {
            PropertyKind::Numeric(n) => {
                let size = n.numeric_type.component_count() * n.component_type.byte_size();
                ElementSize::Bytes(size as u64)
            }
            PropertyKind::Enum { .. } => {
                ElementSize::Bytes(enumeration.map_or(1, |e| e.value_type.byte_size()) as u64)
            }
            PropertyKind::Boolean => ElementSize::Bit,
            PropertyKind::String => ElementSize::Bytes(1),
        }
    }

    fn check_alignment(
        &self,
        context: &mut ValidationContext,
        which: &str,
        view: &BufferView,
        alignment: usize,
    ) -> bool {
        if view.byte_offset % alignment as u64 == 0 {
            return true;
        }
        self.issue(
            context,
            IssueType::MetadataInvalidAlignment,
            format!(
                "The '{which}' buffer view of property '{}' has a byteOffset of {}, which is not \
                 aligned to {alignment} bytes",
                self.name, view.byte_offset
            ),
        );
        false
    }

    fn check_values_length(
        &self,
        context: &mut ValidationContext,
        view: &BufferView,
        expected: Option<u64>,
        derived_from: Option<&str>,
    ) -> bool {
        if expected == Some(view.byte_length) {
            return true;
        }
        let expected = expected.map_or_else(|| "more than 2^64".to_string(), |e| e.to_string());
        let message = match derived_from {
            None => format!(
                "The 'values' buffer view of property '{}' has a byteLength of {}, but {} rows \
                 require {expected} bytes",
                self.name,
                view.byte_length,
                self.table.count()
            ),
            Some(which) => format!(
                "The 'values' buffer view of property '{}' has a byteLength of {}, but the last \
                 of its {which} requires {expected} bytes",
                self.name, view.byte_length
            ),
        };
        self.issue(context, IssueType::MetadataInvalidLength, message);
        false
    }

    /// Check an offsets view holding `count + 1` entries. Returns the last
    /// offset when the view is usable.
    fn check_offsets(
        &self,
        context: &mut ValidationContext,
        which: &str,
        view_index: usize,
        view: &BufferView,
        offset_type: OffsetType,
        count: u64,
    ) -> Option<u64> {
        let expected = count
            .checked_add(1)
            .and_then(|n| n.checked_mul(offset_type.byte_size() as u64));
        if expected != Some(view.byte_length) {
            let expected = expected.map_or_else(|| "more than 2^64".to_string(), |e| e.to_string());
            self.issue(
                context,
                IssueType::MetadataInvalidLength,
                format!(
                    "The '{which}' buffer view of property '{}' has a byteLength of {}, but {} \
                     {offset_type} offsets require {expected} bytes",
                    self.name,
                    view.byte_length,
                    count.saturating_add(1)
                ),
            );
            return None;
        }
        let offsets = self
            .table
            .buffer_view_data(view_index)
            .and_then(|data| {
                let count = usize::try_from(count)
                    .map_err(|_| ReadError::OffsetTooLarge { value: count })?;
                read_offsets(data, offset_type, count)
            });
        let offsets = match offsets {
            Ok(offsets) => offsets,
            Err(e) => {
                tracing::warn!(property = self.name, which, error = %e, "offsets not readable");
                return None;
            }
        };
        if let Some(i) = first_decrease(&offsets) {
            self.issue(
                context,
                IssueType::MetadataInvalidOffsets,
                format!(
                    "The {which} of property '{}' are not ascending: offset {i} is {}, but \
                     offset {} is {}",
                    self.name,
                    offsets[i],
                    i - 1,
                    offsets[i - 1]
                ),
            );
            return None;
        }
        offsets.last().copied()
    }

    fn check_enum_values(
        &self,
        context: &mut ValidationContext,
        model: &PropertyModel<'_>,
        enum_type: &str,
        enumeration: &MetadataEnum,
    ) -> Result<(), ReadError> {
        let no_data = model.no_data_raw();
        for row in 0..model.count() {
            let raw = model.raw_value(row)?;
            if no_data.as_ref() == Some(&raw) {
                continue;
            }
            let elements = match &raw {
                MetadataValue::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            for (index, element) in elements.iter().enumerate() {
                if no_data.as_ref() == Some(element) {
                    continue;
                }
                let known = match element {
                    MetadataValue::Number(Number::Integer(i)) => enumeration.contains_value(*i),
                    _ => false,
                };
                if known {
                    continue;
                }
                let location = if self.class_property.array.is_array() {
                    format!("row {row}, element {index}")
                } else {
                    format!("row {row}")
                };
                let declared: Vec<String> =
                    enumeration.values.iter().map(|v| v.value.to_string()).collect();
                self.issue(
                    context,
                    IssueType::ValueNotInList,
                    format!(
                        "The value of property '{}' at {location} is {element}, which is not one \
                         of the values of enum '{enum_type}' ({})",
                        self.name,
                        declared.join(", ")
                    ),
                );
            }
        }
        Ok(())
    }

    fn check_statistics(
        &self,
        context: &mut ValidationContext,
        model: &PropertyModel<'_>,
        numeric: &NumericProperty,
    ) -> Result<(), ReadError> {
        let table_min = self.table_property.min.as_ref();
        let table_max = self.table_property.max.as_ref();
        let class_min = numeric.min.as_ref();
        let class_max = numeric.max.as_ref();
        let declared = [class_min, class_max, table_min, table_max];
        if declared.iter().all(Option::is_none) {
            return Ok(());
        }

        let mut statistics = ValueStatistics::new();
        for row in 0..model.count() {
            let raw = model.raw_value(row)?;
            if model.is_no_data(&raw) {
                tracing::trace!(property = self.name, row, "noData row excluded from statistics");
                continue;
            }
            let value = model.final_value(&raw);
            match (&value, self.class_property.array) {
                (MetadataValue::Array(items), ArrayShape::Variable) => {
                    for item in items {
                        statistics.add(item);
                    }
                }
                _ => statistics.add(&value),
            }
        }
        let (Some(min), Some(max)) = (statistics.min(), statistics.max()) else {
            tracing::debug!(property = self.name, "no values to compare with declared bounds");
            return Ok(());
        };
        tracing::trace!(property = self.name, %min, %max, "computed statistics");

        // Bounds are strict up to storage rounding; the configured epsilon
        // only widens the equality claim of table-level min/max.
        let rounding = rounding_tolerance(numeric.component_type);
        let equality = rounding.max(self.config.float_epsilon);
        if let Some(declared) = class_min {
            if let Some(d) = find_below(min, declared, rounding) {
                self.not_in_range(context, "class", "minimum", d, "below");
            }
        }
        if let Some(declared) = class_max {
            if let Some(d) = find_above(max, declared, rounding) {
                self.not_in_range(context, "class", "maximum", d, "above");
            }
        }
        if let Some(declared) = table_min {
            if let Some(d) = find_below(min, declared, rounding) {
                self.not_in_range(context, "property table", "minimum", d, "below");
            } else if let Some(d) = find_min_mismatch(min, declared, equality) {
                self.mismatch(context, "minimum", d);
            }
        }
        if let Some(declared) = table_max {
            if let Some(d) = find_above(max, declared, rounding) {
                self.not_in_range(context, "property table", "maximum", d, "above");
            } else if let Some(d) = find_max_mismatch(max, declared, equality) {
                self.mismatch(context, "maximum", d);
            }
        }
        Ok(())
    }

    fn not_in_range(
        &self,
        context: &mut ValidationContext,
        level: &str,
        bound: &str,
        d: Discrepancy,
        relation: &str,
    ) {
        self.issue(
            context,
            IssueType::MetadataValueNotInRange,
            format!(
                "Property '{}' contains the value {}, which is {relation} the {level} {bound} {}",
                self.name, d.actual, d.declared
            ),
        );
    }

    fn mismatch(&self, context: &mut ValidationContext, bound: &str, d: Discrepancy) {
        self.issue(
            context,
            IssueType::MetadataValueMismatch,
            format!(
                "The property table declares a {bound} of {} for property '{}', but the computed \
                 {bound} is {}",
                d.declared, self.name, d.actual
            ),
        );
    }
}

#[derive(Debug, Clone, Copy)]
enum ElementSize {
    Bytes(u64),
    Bit,
}

fn values_byte_length(size: ElementSize, elements: u64) -> Option<u64> {
    match size {
        ElementSize::Bytes(bytes) => elements.checked_mul(bytes),
        ElementSize::Bit => Some(elements.div_ceil(8)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tmv_binary::create_binary_property_table;
    use tmv_core::{ComponentType, OrderedMap};

    fn rows(json: serde_json::Value) -> Vec<MetadataValue> {
        match MetadataValue::from_json(&json).unwrap() {
            MetadataValue::Array(items) => items,
            other => vec![other],
        }
    }

    fn validate(table: &BinaryPropertyTable) -> Vec<IssueType> {
        let mut context = ValidationContext::default();
        BinaryPropertyTableValidator::default().validate("/propertyTables/0", table, &mut context);
        context.into_result().issue_types()
    }

    #[test]
    fn valid_table_has_no_issues() {
        let property = ClassProperty::scalar(ComponentType::Int16);
        let table =
            create_binary_property_table("p", &property, &rows(json!([10, 12])), &OrderedMap::new())
                .unwrap();
        assert!(validate(&table).is_empty());
    }

    #[test]
    fn issue_paths_point_at_the_property() {
        let property = ClassProperty::scalar(ComponentType::Int16)
            .with_numeric(|n| n.min = Some(MetadataValue::from(11i64)));
        let table =
            create_binary_property_table("p", &property, &rows(json!([10, 12])), &OrderedMap::new())
                .unwrap();
        let mut context = ValidationContext::default();
        let validator = BinaryPropertyTableValidator::default();
        let ok = validator.validate("/propertyTables/3", &table, &mut context);
        assert!(!ok);
        let issue = context.result().get(0).unwrap();
        assert_eq!(issue.path, "/propertyTables/3/properties/p");
        assert!(issue.message.contains("10"));
    }

    #[test]
    fn values_checks_can_be_disabled() {
        let property = ClassProperty::scalar(ComponentType::Int16)
            .with_numeric(|n| n.min = Some(MetadataValue::from(11i64)));
        let table =
            create_binary_property_table("p", &property, &rows(json!([10, 12])), &OrderedMap::new())
                .unwrap();
        let config = ValidatorConfig {
            validate_values: false,
            ..ValidatorConfig::default()
        };
        let mut context = ValidationContext::default();
        assert!(validate_binary_property_table("", &table, &config, &mut context));
    }

    #[test]
    fn element_sizes() {
        assert_eq!(values_byte_length(ElementSize::Bit, 8), Some(1));
        assert_eq!(values_byte_length(ElementSize::Bit, 9), Some(2));
        assert_eq!(values_byte_length(ElementSize::Bytes(6), 3), Some(18));
        assert_eq!(values_byte_length(ElementSize::Bytes(8), u64::MAX), None);
    }
}
