//! Child streams derived from nested arrays of objects

use super::flatten::{flatten_record_unpromoted, flatten_schema_unpromoted, leaf_column, SEPARATOR};
use crate::schema::{FieldType, JsonType};
use crate::types::JsonObject;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Prefix of the synthetic foreign-key columns
pub const SOURCE_KEY_PREFIX: &str = "_sdc_source_key_";

/// Column holding an item's position in its parent array
pub const SEQUENCE_COLUMN: &str = "_sdc_sequence";

/// A stream derived from one top-level array field of a parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildStream {
    /// `{parent}__{array_key}`
    pub name: String,
    /// Owning stream
    pub parent: String,
    /// Field in the parent record holding the items
    pub array_key: String,
    /// Flattened item schema plus key columns
    pub schema: FieldType,
    /// Foreign keys followed by the sequence column
    pub key_properties: Vec<String>,
    /// Item schema before flattening
    item_schema: FieldType,
}

/// Name of the foreign-key column for a parent key
pub fn source_key_column(parent_key: &str) -> String {
    format!("{SOURCE_KEY_PREFIX}{parent_key}")
}

/// Find the top-level fields that become child streams
pub fn identify_child_streams(
    schema: &FieldType,
    stream: &str,
    key_columns: &[String],
) -> BTreeMap<String, ChildStream> {
    let mut children = BTreeMap::new();

    for (field_name, field) in &schema.properties {
        if !field.is_array_of_objects() {
            continue;
        }
        let Some(item_schema) = field.items.as_deref() else {
            continue;
        };

        let mut columns = BTreeMap::new();
        for key in key_columns {
            let key_type = schema
                .property(key)
                .map_or_else(|| FieldType::nullable(JsonType::String), leaf_column);
            columns.insert(source_key_column(key), key_type);
        }
        columns.insert(
            SEQUENCE_COLUMN.to_string(),
            FieldType::nullable(JsonType::Integer),
        );
        for (column, column_type) in flatten_schema_unpromoted(item_schema) {
            columns.entry(column).or_insert(column_type);
        }

        let mut key_properties: Vec<String> =
            key_columns.iter().map(|k| source_key_column(k)).collect();
        key_properties.push(SEQUENCE_COLUMN.to_string());

        let name = format!("{stream}{SEPARATOR}{field_name}");
        debug!(
            child = %name,
            array_key = %field_name,
            properties = item_schema.properties.len(),
            "Identified child stream"
        );

        children.insert(
            name.clone(),
            ChildStream {
                name,
                parent: stream.to_string(),
                array_key: field_name.clone(),
                schema: FieldType::object(columns),
                key_properties,
                item_schema: item_schema.clone(),
            },
        );
    }

    children
}

/// Derive the child records carried by one parent record
///
/// Non-object items are skipped but still consume a sequence number, so
/// `_sdc_sequence` always equals the item's index in the source array.
pub fn extract_child_records(
    record: &JsonObject,
    child: &ChildStream,
    key_columns: &[String],
) -> Vec<JsonObject> {
    let Some(Value::Array(items)) = record.get(&child.array_key) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(item) = item else {
            continue;
        };

        let mut row = JsonObject::new();
        for key in key_columns {
            let value = record.get(key).cloned().unwrap_or(Value::Null);
            row.insert(source_key_column(key), value);
        }
        row.insert(SEQUENCE_COLUMN.to_string(), Value::from(index));

        for (column, value) in flatten_record_unpromoted(item, Some(&child.item_schema)) {
            row.entry(column).or_insert(value);
        }
        out.push(row);
    }
    out
}
