//! Per-stream denesting state

use super::children::{extract_child_records, identify_child_streams, ChildStream};
use super::flatten::{flatten_record, flatten_schema};
use crate::schema::FieldType;
use crate::types::JsonObject;
use std::collections::BTreeMap;

/// Flattens one stream's records and splits out its child streams
///
/// Everything here is derived from the parent schema and key columns; build
/// a new `Denester` whenever the schema is rediscovered.
#[derive(Debug, Clone)]
pub struct Denester {
    key_columns: Vec<String>,
    schema: FieldType,
    flat_schema: FieldType,
    children: BTreeMap<String, ChildStream>,
}

impl Denester {
    /// Build the denesting plan for a stream
    pub fn new(stream: impl Into<String>, schema: &FieldType, key_columns: &[String]) -> Self {
        let stream = stream.into();
        Self {
            children: identify_child_streams(schema, &stream, key_columns),
            flat_schema: flatten_schema(schema),
            key_columns: key_columns.to_vec(),
            schema: schema.clone(),
        }
    }

    /// Flattened parent schema
    pub fn flat_schema(&self) -> &FieldType {
        &self.flat_schema
    }

    /// Child streams keyed by name
    pub fn children(&self) -> &BTreeMap<String, ChildStream> {
        &self.children
    }

    /// Flatten a parent record; promoted arrays are removed
    pub fn flatten_record(&self, record: &JsonObject) -> JsonObject {
        flatten_record(record, Some(&self.schema))
    }

    /// Child records of one parent record for one child stream
    pub fn child_records(&self, record: &JsonObject, child: &ChildStream) -> Vec<JsonObject> {
        extract_child_records(record, child, &self.key_columns)
    }
}
