//! Record extraction cascade

use super::path::PathExpr;
use crate::error::Result;
use crate::types::JsonObject;
use serde_json::Value;
use tracing::{debug, warn};

/// Conventional wrapper keys, in priority order
pub const WRAPPER_KEYS: &[&str] = &[
    "data",
    "results",
    "items",
    "records",
    "value",
    "entries",
    "objects",
    "rows",
    "content",
    "hits",
    "documents",
    "list",
    "response",
    "payload",
];

/// Extracts records from pages using an optional, pre-validated path
#[derive(Debug, Clone, Default)]
pub struct RecordExtractor {
    path: Option<PathExpr>,
}

impl RecordExtractor {
    /// Extractor that always auto-detects
    pub fn auto() -> Self {
        Self::default()
    }

    /// Build an extractor, validating the records path up front
    pub fn new(records_path: Option<&str>) -> Result<Self> {
        let path = match records_path.map(str::trim) {
            Some(p) if !p.is_empty() => Some(PathExpr::parse(p)?),
            _ => None,
        };
        Ok(Self { path })
    }

    /// The configured records path, if any
    pub fn path(&self) -> Option<&str> {
        self.path.as_ref().map(PathExpr::as_str)
    }

    /// Extract the records contained in one page, preserving order
    pub fn extract(&self, page: &Value) -> Vec<JsonObject> {
        match page {
            Value::Array(items) => objects_of(items),
            Value::Object(map) => match &self.path {
                Some(path) => extract_at_path(page, path),
                None => autodetect(map),
            },
            _ => Vec::new(),
        }
    }
}

/// One-shot extraction
///
/// An invalid `records_path` is logged and treated as matching nothing.
pub fn extract_records(page: &Value, records_path: Option<&str>) -> Vec<JsonObject> {
    match RecordExtractor::new(records_path) {
        Ok(extractor) => extractor.extract(page),
        Err(e) => {
            warn!("{e}");
            Vec::new()
        }
    }
}

fn extract_at_path(page: &Value, path: &PathExpr) -> Vec<JsonObject> {
    let matches = path.find(page);
    if matches.is_empty() {
        warn!(path = path.as_str(), "Records path matched nothing in response");
        return Vec::new();
    }

    let mut records = Vec::new();
    for matched in matches {
        match matched {
            Value::Array(items) => records.extend(objects_of(&items)),
            Value::Object(obj) => records.push(obj),
            _ => {}
        }
    }
    records
}

fn autodetect(map: &JsonObject) -> Vec<JsonObject> {
    for key in WRAPPER_KEYS {
        match map.get(*key) {
            Some(Value::Array(items)) => {
                let records = objects_of(items);
                if !records.is_empty() {
                    debug!(key, count = records.len(), "Auto-detected records");
                    return records;
                }
            }
            Some(Value::Object(inner)) => {
                for sub_key in WRAPPER_KEYS {
                    if let Some(Value::Array(items)) = inner.get(*sub_key) {
                        let records = objects_of(items);
                        if !records.is_empty() {
                            debug!(key, sub_key, count = records.len(), "Auto-detected records");
                            return records;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(key) = largest_object_array(map) {
        if let Some(Value::Array(items)) = map.get(key) {
            debug!(key, "Falling back to largest array of objects");
            return objects_of(items);
        }
    }

    debug!("No record array found; treating response as a single record");
    vec![map.clone()]
}

/// Field with the most object elements; ties go to the first key in sorted order
fn largest_object_array(map: &JsonObject) -> Option<&str> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut best: Option<(&str, usize)> = None;
    for key in keys {
        if let Some(Value::Array(items)) = map.get(key) {
            let count = items.iter().filter(|v| v.is_object()).count();
            if count > best.map_or(0, |(_, c)| c) {
                best = Some((key.as_str(), count));
            }
        }
    }
    best.map(|(key, _)| key)
}

fn objects_of(items: &[Value]) -> Vec<JsonObject> {
    items
        .iter()
        .filter_map(|v| v.as_object().cloned())
        .collect()
}
