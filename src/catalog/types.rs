//! Catalog document types
//!
//! The catalog is what `discover` prints and what `sync --catalog` reads
//! back: one entry per parent stream and per child stream, each with its
//! emitted schema and Singer-style metadata.

use crate::error::{Error, Result};
use crate::schema::FieldType;
use crate::types::{JsonObject, ReplicationMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Prefix of columns the tap adds itself
pub const SDC_PREFIX: &str = "_sdc_";

// ============================================================================
// Catalog
// ============================================================================

/// Discovered streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Create a catalog from entries
    pub fn new(streams: Vec<CatalogEntry>) -> Self {
        Self { streams }
    }

    /// Load a catalog document from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read catalog file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Parse a catalog document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("Invalid catalog: {e}")))
    }

    /// Render as pretty-printed JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up an entry by stream id
    pub fn get(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|e| e.tap_stream_id == tap_stream_id)
    }

    /// Entries whose stream-level metadata marks them selected
    pub fn selected(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.iter().filter(|e| e.is_selected())
    }

    /// Child entries of a parent stream
    pub fn children_of<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a CatalogEntry> {
        self.streams
            .iter()
            .filter(move |e| e.parent_stream.as_deref() == Some(parent))
    }
}

// ============================================================================
// Catalog Entry
// ============================================================================

/// One stream of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub tap_stream_id: String,
    pub stream: String,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    #[serde(default)]
    pub replication_method: ReplicationMethod,
    /// Set on child streams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_stream: Option<String>,
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Build an entry with standard metadata, selected by default
    pub fn new(
        stream: impl Into<String>,
        schema: &FieldType,
        key_properties: Vec<String>,
        replication_key: Option<String>,
        replication_method: ReplicationMethod,
    ) -> Self {
        let stream = stream.into();
        let metadata = build_metadata(
            schema,
            &key_properties,
            replication_key.as_deref(),
            replication_method,
        );

        Self {
            tap_stream_id: stream.clone(),
            stream,
            schema: schema.to_json_schema(),
            key_properties,
            replication_key,
            replication_method,
            parent_stream: None,
            metadata,
        }
    }

    /// Mark as a child of `parent`
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_stream = Some(parent.into());
        self
    }

    /// Metadata at the empty breadcrumb
    pub fn stream_metadata(&self) -> Option<&JsonObject> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.is_empty())
            .map(|m| &m.metadata)
    }

    /// Selected only when stream-level `selected` is `true`
    pub fn is_selected(&self) -> bool {
        self.stream_metadata()
            .and_then(|m| m.get("selected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Set stream-level `selected`
    pub fn set_selected(&mut self, selected: bool) {
        match self.metadata.iter_mut().find(|m| m.breadcrumb.is_empty()) {
            Some(entry) => {
                entry.metadata.insert("selected".to_string(), Value::Bool(selected));
            }
            None => {
                let mut metadata = JsonObject::new();
                metadata.insert("selected".to_string(), Value::Bool(selected));
                self.metadata.insert(
                    0,
                    MetadataEntry {
                        breadcrumb: Vec::new(),
                        metadata,
                    },
                );
            }
        }
    }

    /// Parse the entry's schema document
    pub fn field_type(&self) -> Result<FieldType> {
        FieldType::from_json_schema(&self.schema)
            .map_err(|e| Error::schema(format!("stream '{}': {e}", self.tap_stream_id)))
    }
}

/// Metadata attached to a breadcrumb (`[]` for the stream,
/// `["properties", field]` for a field)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub breadcrumb: Vec<String>,
    pub metadata: JsonObject,
}

fn build_metadata(
    schema: &FieldType,
    key_properties: &[String],
    replication_key: Option<&str>,
    replication_method: ReplicationMethod,
) -> Vec<MetadataEntry> {
    let mut stream = JsonObject::new();
    stream.insert(
        "table-key-properties".to_string(),
        Value::from(key_properties.to_vec()),
    );
    stream.insert(
        "forced-replication-method".to_string(),
        Value::from(replication_method.to_string()),
    );
    if let Some(key) = replication_key {
        stream.insert("valid-replication-keys".to_string(), Value::from(vec![key]));
    }
    stream.insert("selected".to_string(), Value::Bool(true));

    let mut entries = vec![MetadataEntry {
        breadcrumb: Vec::new(),
        metadata: stream,
    }];

    for field in schema.properties.keys() {
        let automatic = key_properties.contains(field)
            || replication_key == Some(field.as_str())
            || field.starts_with(SDC_PREFIX);

        let mut metadata = JsonObject::new();
        if automatic {
            metadata.insert("inclusion".to_string(), Value::from("automatic"));
        } else {
            metadata.insert("inclusion".to_string(), Value::from("available"));
            metadata.insert("selected-by-default".to_string(), Value::Bool(true));
        }
        entries.push(MetadataEntry {
            breadcrumb: vec!["properties".to_string(), field.clone()],
            metadata,
        });
    }

    entries
}
