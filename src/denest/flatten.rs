//! Flattening of schemas and records
//!
//! Both sides follow the same rules so that every key a conforming record
//! produces is a property of the flattened schema:
//!
//! - structured objects recurse, joining names with [`SEPARATOR`]
//! - a null at a position that only ever holds structured objects
//!   contributes nothing
//! - arrays (other than promoted top-level ones) and opaque objects become
//!   JSON text
//! - promoted top-level arrays are removed

use crate::schema::{FieldType, JsonType, DEFAULT_MAX_DEPTH};
use crate::types::JsonObject;
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;

/// Separator joining nested field names
pub const SEPARATOR: &str = "__";

// ============================================================================
// Schema side
// ============================================================================

/// Flatten a stream schema, dropping fields that become child streams
pub fn flatten_schema(schema: &FieldType) -> FieldType {
    let mut columns = BTreeMap::new();
    flatten_properties(&schema.properties, "", true, &mut columns);
    FieldType::object(columns)
}

/// Flatten a schema without promoting any arrays (used for child items)
pub(crate) fn flatten_schema_unpromoted(schema: &FieldType) -> BTreeMap<String, FieldType> {
    let mut columns = BTreeMap::new();
    flatten_properties(&schema.properties, "", false, &mut columns);
    columns
}

fn flatten_properties(
    properties: &BTreeMap<String, FieldType>,
    prefix: &str,
    promote: bool,
    out: &mut BTreeMap<String, FieldType>,
) {
    for (key, field) in properties {
        if promote && field.is_array_of_objects() {
            continue;
        }

        let name = join(prefix, key);
        if field.is_structured_object() {
            flatten_properties(&field.properties, &name, false, out);
            if has_scalar_column(field) {
                out.insert(name, leaf_column(field));
            }
        } else {
            out.insert(name, leaf_column(field));
        }
    }
}

/// Does this position need a column of its own beside any nested columns?
fn has_scalar_column(field: &FieldType) -> bool {
    if !field.is_structured_object() {
        return true;
    }
    field
        .kinds
        .iter()
        .any(|k| !matches!(k, JsonType::Null | JsonType::Object))
}

/// Column type for a non-recursed position: containers become JSON text
pub(crate) fn leaf_column(field: &FieldType) -> FieldType {
    let mut kinds: Vec<JsonType> = field
        .kinds
        .iter()
        .map(|k| match k {
            JsonType::Array => JsonType::String,
            JsonType::Object if !field.opaque => JsonType::Null,
            JsonType::Object => JsonType::String,
            other => *other,
        })
        .collect();
    kinds.push(JsonType::Null);
    if kinds.iter().all(|k| *k == JsonType::Null) {
        kinds.push(JsonType::String);
    }

    let mut column = FieldType::of_kinds(kinds);
    if column.has(JsonType::String) {
        column.format.clone_from(&field.format);
    }
    column
}

// ============================================================================
// Record side
// ============================================================================

/// Flatten a record against its stream schema
///
/// Fields the schema promotes to child streams are removed. Without a schema
/// every nested object is expanded up to the depth cap.
pub fn flatten_record(record: &JsonObject, schema: Option<&FieldType>) -> JsonObject {
    let mut out = JsonObject::new();
    flatten_object(record, schema, "", true, 0, &mut out);
    out
}

/// Flatten without removing any arrays (used for child items)
pub(crate) fn flatten_record_unpromoted(
    record: &JsonObject,
    schema: Option<&FieldType>,
) -> JsonObject {
    let mut out = JsonObject::new();
    flatten_object(record, schema, "", false, 0, &mut out);
    out
}

fn flatten_object(
    record: &JsonObject,
    schema: Option<&FieldType>,
    prefix: &str,
    promote: bool,
    depth: usize,
    out: &mut JsonObject,
) {
    for (key, value) in record {
        let field = schema.and_then(|s| s.property(key));

        if promote && field.is_some_and(FieldType::is_array_of_objects) {
            continue;
        }

        let name = join(prefix, key);
        match value {
            Value::Object(map) => {
                let expand = match field {
                    Some(f) => f.is_structured_object(),
                    None => depth < DEFAULT_MAX_DEPTH,
                };
                if expand {
                    flatten_object(map, field, &name, false, depth + 1, out);
                } else if !map.is_empty() {
                    out.insert(name, Value::String(to_json_text(value)));
                }
            }
            Value::Array(items) => {
                let text = if items.is_empty() {
                    Value::Null
                } else {
                    Value::String(to_json_text(value))
                };
                out.insert(name, text);
            }
            Value::Null => {
                if field.map_or(true, has_scalar_column) {
                    out.insert(name, Value::Null);
                }
            }
            scalar => {
                out.insert(name, scalar.clone());
            }
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{SEPARATOR}{key}")
    }
}

// ============================================================================
// JSON text
// ============================================================================

/// Compact JSON with a space after `,` and `:`, e.g. `["a", "b"]`
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize a value as JSON text for a string column
pub fn to_json_text(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    match value.serialize(&mut ser) {
        Ok(()) => String::from_utf8(buf).unwrap_or_else(|_| value.to_string()),
        Err(_) => value.to_string(),
    }
}
