//! Schema inference from sample records

use super::types::{FieldType, InferredSchema, JsonType, DATE_TIME_FORMAT};
use crate::types::JsonObject;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::debug;

/// Default number of records examined
pub const DEFAULT_MAX_SAMPLE: usize = 500;

/// Default nesting depth beyond which object shape is dropped
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Array elements examined per array value
pub const ARRAY_SAMPLE: usize = 10;

/// `YYYY-MM-DD[T ]HH:MM:SS[.fraction][Z|+HH:MM|+HHMM]`
static DATE_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$")
        .expect("date-time pattern is valid")
});

/// Schema inferrer with configuration options
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Maximum records to examine
    max_sample: usize,
    /// Maximum depth for nested objects
    max_depth: usize,
    /// Elements examined per array
    array_sample: usize,
    /// Tag date-time looking strings
    detect_datetime: bool,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaInferrer {
    /// Create a new schema inferrer with default settings
    pub fn new() -> Self {
        Self {
            max_sample: DEFAULT_MAX_SAMPLE,
            max_depth: DEFAULT_MAX_DEPTH,
            array_sample: ARRAY_SAMPLE,
            detect_datetime: true,
        }
    }

    /// Set the number of records examined
    #[must_use]
    pub fn with_max_sample(mut self, max_sample: usize) -> Self {
        self.max_sample = max_sample;
        self
    }

    /// Set maximum depth for nested objects
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable/disable datetime detection
    #[must_use]
    pub fn with_datetime_detection(mut self, enabled: bool) -> Self {
        self.detect_datetime = enabled;
        self
    }

    /// Infer a stream schema from sample records
    pub fn infer<'a, I>(&self, records: I) -> InferredSchema
    where
        I: IntoIterator<Item = &'a JsonObject>,
    {
        let mut properties = BTreeMap::new();
        let mut count = 0;

        for record in records.into_iter().take(self.max_sample) {
            self.observe_object(&mut properties, record, 0);
            count += 1;
        }

        debug!(
            records = count,
            properties = properties.len(),
            "Schema inferred from sample"
        );
        FieldType::object(properties)
    }

    /// Infer the type of a single value at the given depth
    pub fn infer_value(&self, value: &Value, depth: usize) -> FieldType {
        match value {
            Value::Null => FieldType::nullable(JsonType::String),
            Value::String(s) if self.detect_datetime && looks_like_datetime(s) => {
                FieldType::nullable(JsonType::String).with_format(DATE_TIME_FORMAT)
            }
            Value::Object(map) => {
                if depth >= self.max_depth {
                    let mut opaque = FieldType::nullable(JsonType::Object);
                    opaque.opaque = true;
                    return opaque;
                }
                let mut properties = BTreeMap::new();
                self.observe_object(&mut properties, map, depth + 1);
                FieldType::object(properties)
            }
            Value::Array(items) => {
                let element = items
                    .iter()
                    .take(self.array_sample)
                    .map(|item| self.infer_value(item, depth + 1))
                    .reduce(|acc, next| acc.merge(&next));
                let array = FieldType::nullable(JsonType::Array);
                match element {
                    Some(element) => array.with_items(element),
                    None => array,
                }
            }
            other => FieldType::nullable(JsonType::of(other)),
        }
    }

    fn observe_object(
        &self,
        properties: &mut BTreeMap<String, FieldType>,
        record: &JsonObject,
        depth: usize,
    ) {
        for (key, value) in record {
            let observed = self.infer_value(value, depth);
            match properties.get_mut(key) {
                Some(existing) => existing.absorb(&observed),
                None => {
                    properties.insert(key.clone(), observed);
                }
            }
        }
    }
}

/// Infer a schema with default settings
pub fn infer_schema<'a, I>(records: I, max_sample: usize) -> InferredSchema
where
    I: IntoIterator<Item = &'a JsonObject>,
{
    SchemaInferrer::new()
        .with_max_sample(max_sample)
        .infer(records)
}

/// Check if a string looks like an ISO 8601 date-time
pub fn looks_like_datetime(value: &str) -> bool {
    value.len() >= 19 && DATE_TIME_REGEX.is_match(value)
}
