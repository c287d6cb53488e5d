//! The encoder and the materializer must agree: every value written by
//! `create_binary_property_table` reads back unchanged.

use proptest::prelude::*;

use tmv_binary::{
    create_binary_property_table, create_binary_property_table_with, BinaryPropertyTable,
    EncodeOptions, PropertyModel,
};
use tmv_core::{
    ArrayShape, ClassProperty, ComponentType, MetadataValue, Number, NumericType, OffsetType,
    OrderedMap,
};

fn read_all(table: &BinaryPropertyTable) -> Vec<MetadataValue> {
    let model = PropertyModel::new(table, "p").unwrap();
    (0..model.count()).map(|row| model.raw_value(row).unwrap()).collect()
}

fn int_rows(values: &[i64]) -> Vec<MetadataValue> {
    values.iter().map(|v| MetadataValue::from(*v)).collect()
}

#[test]
fn int64_extremes_read_back_exactly() {
    let property = ClassProperty::scalar(ComponentType::Int64);
    let rows = int_rows(&[i64::MIN, -1, 0, i64::MAX]);
    let table = create_binary_property_table("p", &property, &rows, &OrderedMap::new()).unwrap();
    assert_eq!(read_all(&table), rows);
}

#[test]
fn uint64_max_reads_back_exactly() {
    let property = ClassProperty::scalar(ComponentType::Uint64);
    let rows = vec![MetadataValue::Number(Number::Integer(u64::MAX as i128))];
    let table = create_binary_property_table("p", &property, &rows, &OrderedMap::new()).unwrap();
    assert_eq!(read_all(&table), rows);
}

#[test]
fn fixed_length_matrix_arrays() {
    let property = ClassProperty::numeric(NumericType::Mat2, ComponentType::Float32)
        .with_array(ArrayShape::Fixed(2));
    let row = MetadataValue::Array(vec![
        MetadataValue::from(vec![1.0, 0.0, 0.0, 1.0]),
        MetadataValue::from(vec![0.5, -0.5, 2.0, 4.0]),
    ]);
    let table =
        create_binary_property_table("p", &property, &[row.clone()], &OrderedMap::new()).unwrap();
    assert_eq!(read_all(&table), vec![row]);
}

fn component_type() -> impl Strategy<Value = ComponentType> {
    prop::sample::select(
        ComponentType::all()
            .iter()
            .copied()
            .filter(|c| c.is_integer())
            .collect::<Vec<_>>(),
    )
}

fn offset_type() -> impl Strategy<Value = OffsetType> {
    prop::sample::select(vec![
        OffsetType::Uint8,
        OffsetType::Uint16,
        OffsetType::Uint32,
        OffsetType::Uint64,
    ])
}

proptest! {
    #[test]
    fn integer_scalars_round_trip(
        component_type in component_type(),
        seeds in prop::collection::vec(any::<i64>(), 0..20),
    ) {
        let min = component_type.min_integer().unwrap();
        let max = component_type.max_integer().unwrap();
        let rows: Vec<MetadataValue> = seeds
            .iter()
            .map(|s| MetadataValue::Number(Number::Integer((*s as i128).clamp(min, max))))
            .collect();
        let property = ClassProperty::scalar(component_type);
        let table = create_binary_property_table("p", &property, &rows, &OrderedMap::new()).unwrap();
        prop_assert_eq!(read_all(&table), rows);
    }

    #[test]
    fn variable_length_string_arrays_round_trip(
        rows in prop::collection::vec(prop::collection::vec("[a-z\u{e9}]{0,6}", 0..4), 0..10),
        array_offset_type in offset_type(),
        string_offset_type in offset_type(),
    ) {
        let values: Vec<MetadataValue> = rows
            .iter()
            .map(|row| MetadataValue::Array(row.iter().map(|s| MetadataValue::from(s.as_str())).collect()))
            .collect();
        let property = ClassProperty::string().with_array(ArrayShape::Variable);
        let options = EncodeOptions { array_offset_type, string_offset_type };
        match create_binary_property_table_with("p", &property, &values, &OrderedMap::new(), options) {
            Ok(table) => prop_assert_eq!(read_all(&table), values),
            // Only UINT8 offsets can overflow with these sizes.
            Err(_) => prop_assert!(
                array_offset_type == OffsetType::Uint8 || string_offset_type == OffsetType::Uint8
            ),
        }
    }

    #[test]
    fn boolean_rows_round_trip(bits in prop::collection::vec(any::<bool>(), 0..40)) {
        let rows: Vec<MetadataValue> = bits.iter().map(|b| MetadataValue::from(*b)).collect();
        let property = ClassProperty::boolean();
        let table = create_binary_property_table("p", &property, &rows, &OrderedMap::new()).unwrap();
        prop_assert_eq!(table.buffer_view(0).unwrap().byte_length, bits.len().div_ceil(8) as u64);
        prop_assert_eq!(read_all(&table), rows);
    }
}
