//! # Inspect Subcommand
//!
//! Prints the entity values of one property table as JSON: final values
//! (normalized, scaled, offset, enum names), with `noData` replaced by the
//! declared `default` or `null`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::{json, Map, Value};

use tmv_binary::{BinaryPropertyTable, PropertyModel};
use tmv_validate::MetadataDocument;

use crate::EXIT_OK;

/// Arguments for the `tmv inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// The metadata document to read.
    #[arg(value_name = "DOCUMENT")]
    pub document: PathBuf,

    /// Index of the property table.
    #[arg(long, default_value_t = 0)]
    pub table: usize,

    /// Print at most this many rows.
    #[arg(long)]
    pub rows: Option<u64>,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs, out: &mut impl Write) -> Result<u8> {
    let document = MetadataDocument::load_file(&args.document)
        .with_context(|| format!("failed to load {}", args.document.display()))?;
    let Some(table) = document.binary_property_table(args.table) else {
        bail!(
            "property table {} does not exist; the document has {}",
            args.table,
            document.table_count()
        );
    };
    let rows = args.rows.map_or(table.count(), |n| n.min(table.count()));
    let report = table_values(&table, rows)?;
    serde_json::to_writer_pretty(&mut *out, &report).context("failed to write values")?;
    writeln!(out)?;
    Ok(EXIT_OK)
}

/// The first `rows` rows of every stored property, in class order.
pub fn table_values(table: &BinaryPropertyTable, rows: u64) -> Result<Value> {
    let names: Vec<&str> = table
        .class()
        .map(|class| class.properties.keys().collect())
        .unwrap_or_default();
    let mut models = Vec::new();
    for name in names {
        if table.table_property(name).is_none() {
            continue;
        }
        let model = PropertyModel::new(table, name)
            .with_context(|| format!("property '{name}' cannot be read"))?;
        models.push(model);
    }

    let mut values = Vec::new();
    for row in 0..rows {
        let mut entity = Map::new();
        for model in &models {
            let value = model
                .entity_value(row)
                .with_context(|| format!("row {row} of property '{}' cannot be read", model.name()))?;
            entity.insert(
                model.name().to_string(),
                value.map_or(Value::Null, |v| v.to_json()),
            );
        }
        values.push(Value::Object(entity));
    }
    Ok(json!({
        "class": table.class_name(),
        "count": table.count(),
        "rows": values,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tmv_binary::create_binary_property_table;
    use tmv_core::{ClassProperty, ComponentType, MetadataValue, OrderedMap};

    #[test]
    fn values_are_final_and_substituted() {
        let property = ClassProperty::scalar(ComponentType::Uint8)
            .with_no_data(MetadataValue::from(255i64))
            .with_default(MetadataValue::from(-1.0))
            .with_numeric(|n| {
                n.offset = Some(MetadataValue::from(1i64));
            });
        let rows = vec![MetadataValue::from(4i64), MetadataValue::from(255i64)];
        let table = create_binary_property_table("v", &property, &rows, &OrderedMap::new()).unwrap();

        let report = table_values(&table, 2).unwrap();
        assert_eq!(report["count"], json!(2));
        assert_eq!(report["rows"][0]["v"], json!(5));
        assert_eq!(report["rows"][1]["v"], json!(-1.0));
    }

    #[test]
    fn row_limit() {
        let property = ClassProperty::string();
        let rows = vec![MetadataValue::from("a"), MetadataValue::from("b")];
        let table = create_binary_property_table("s", &property, &rows, &OrderedMap::new()).unwrap();
        let report = table_values(&table, 1).unwrap();
        assert_eq!(report["rows"], json!([{"s": "a"}]));
    }
}
