//! Conforming flattened records to their emitted schema
//!
//! Kinds are checked recursively against the schema. Integers are widened
//! to floats where the schema only allows `number`. Fields the schema does
//! not describe pass through untouched.

use crate::error::{Error, Result};
use crate::schema::{FieldType, JsonType};
use crate::types::JsonObject;
use serde_json::Value;

/// Conform a record to a stream schema
pub fn conform(record: &JsonObject, schema: &FieldType) -> Result<JsonObject> {
    conform_object(record, schema, "")
}

fn conform_object(record: &JsonObject, schema: &FieldType, prefix: &str) -> Result<JsonObject> {
    let mut out = JsonObject::new();
    for (key, value) in record {
        let value = match schema.property(key) {
            Some(field) => conform_value(value, field, &join(prefix, key))?,
            None => value.clone(),
        };
        out.insert(key.clone(), value);
    }
    Ok(out)
}

fn conform_value(value: &Value, field: &FieldType, path: &str) -> Result<Value> {
    if field.kinds.is_empty() {
        return Ok(value.clone());
    }

    let kind = JsonType::of(value);
    if !field.has(kind) {
        return match value {
            Value::Number(n) if kind == JsonType::Integer && field.has(JsonType::Number) => {
                Ok(n.as_f64().map_or_else(|| value.clone(), Value::from))
            }
            _ => Err(Error::schema(format!(
                "field '{path}': {kind} does not match {}",
                describe(field)
            ))),
        };
    }

    match value {
        Value::Object(map) if field.is_structured_object() => {
            Ok(Value::Object(conform_object(map, field, path)?))
        }
        Value::Array(items) => match field.items.as_deref() {
            Some(item_field) => items
                .iter()
                .map(|item| conform_value(item, item_field, path))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            None => Ok(value.clone()),
        },
        _ => Ok(value.clone()),
    }
}

fn describe(field: &FieldType) -> String {
    field
        .kinds
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
