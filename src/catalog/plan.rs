//! Per-stream extraction plan
//!
//! A [`StreamPlan`] is everything sync needs to turn raw API records into
//! emitted rows: the parent schema, the denesting plan and the child streams
//! that will be written. It is built either from a freshly discovered schema
//! or from a catalog document.

use super::types::{Catalog, CatalogEntry, SDC_PREFIX};
use crate::config::StreamDefinition;
use crate::denest::{ChildStream, Denester, SEPARATOR};
use crate::error::{Error, Result};
use crate::schema::{FieldType, JsonType};
use crate::types::{JsonObject, ReplicationMethod};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A child stream that will be emitted
#[derive(Debug, Clone)]
pub struct ChildPlan {
    pub schema: FieldType,
    pub key_properties: Vec<String>,
}

/// Schema and denesting plan for one parent stream
#[derive(Debug, Clone)]
pub struct StreamPlan {
    stream: String,
    schema: FieldType,
    key_properties: Vec<String>,
    denester: Option<Denester>,
    children: BTreeMap<String, ChildPlan>,
}

impl StreamPlan {
    /// Plan from a raw (unflattened) stream schema
    pub fn discovered(definition: &StreamDefinition, raw: &FieldType) -> Self {
        let key_properties = definition.primary_keys.clone();

        if !definition.denest {
            return Self {
                stream: definition.name.clone(),
                schema: raw.clone(),
                key_properties,
                denester: None,
                children: BTreeMap::new(),
            };
        }

        let denester = Denester::new(&definition.name, raw, &key_properties);
        let children = denester
            .children()
            .values()
            .map(|child| {
                (
                    child.name.clone(),
                    ChildPlan {
                        schema: child.schema.clone(),
                        key_properties: child.key_properties.clone(),
                    },
                )
            })
            .collect();

        Self {
            stream: definition.name.clone(),
            schema: denester.flat_schema().clone(),
            key_properties,
            denester: Some(denester),
            children,
        }
    }

    /// Plan from a catalog's parent entry and its child entries
    ///
    /// The denesting plan is rebuilt from the catalog alone. Nested objects
    /// are restored from `a__b` column names. Every child entry marks its
    /// array field as promoted, but only selected children are emitted.
    pub fn from_catalog(definition: &StreamDefinition, catalog: &Catalog) -> Result<Self> {
        let entry = catalog
            .get(&definition.name)
            .ok_or_else(|| Error::StreamNotFound {
                stream: definition.name.clone(),
            })?;
        let schema = entry.field_type()?;
        let key_properties = if entry.key_properties.is_empty() {
            definition.primary_keys.clone()
        } else {
            entry.key_properties.clone()
        };

        if !definition.denest {
            return Ok(Self {
                stream: definition.name.clone(),
                schema,
                key_properties,
                denester: None,
                children: BTreeMap::new(),
            });
        }

        let prefix = format!("{}{SEPARATOR}", definition.name);
        let mut raw = schema.clone();
        raw.properties = nest_columns(&schema.properties);
        let mut children = BTreeMap::new();

        for child in catalog.children_of(&definition.name) {
            let Some(array_key) = child.stream.strip_prefix(&prefix) else {
                warn!(child = %child.stream, "Child stream name does not match its parent, skipping");
                continue;
            };
            let child_schema = child.field_type()?;
            raw.properties
                .insert(array_key.to_string(), promoted_array(&child_schema));

            if child.is_selected() {
                children.insert(
                    child.stream.clone(),
                    ChildPlan {
                        schema: child_schema,
                        key_properties: child.key_properties.clone(),
                    },
                );
            } else {
                debug!(child = %child.stream, "Child stream not selected");
            }
        }

        Ok(Self {
            stream: definition.name.clone(),
            schema,
            denester: Some(Denester::new(&definition.name, &raw, &key_properties)),
            key_properties,
            children,
        })
    }

    /// Emitted parent schema
    pub fn schema(&self) -> &FieldType {
        &self.schema
    }

    /// Parent key properties
    pub fn key_properties(&self) -> &[String] {
        &self.key_properties
    }

    /// Child streams that will be emitted, by name
    pub fn children(&self) -> &BTreeMap<String, ChildPlan> {
        &self.children
    }

    /// Flatten a raw record for the parent stream
    pub fn flatten(&self, record: &JsonObject) -> JsonObject {
        match &self.denester {
            Some(denester) => denester.flatten_record(record),
            None => record.clone(),
        }
    }

    /// Child rows of one raw parent record, for each emitted child
    pub fn child_records(&self, record: &JsonObject) -> Vec<(&str, Vec<JsonObject>)> {
        let Some(denester) = &self.denester else {
            return Vec::new();
        };

        self.children
            .keys()
            .filter_map(|name| denester.children().get(name))
            .map(|child: &ChildStream| {
                (child.name.as_str(), denester.child_records(record, child))
            })
            .collect()
    }

    /// Catalog entries for this plan: the parent, then each child
    pub fn catalog_entries(&self, definition: &StreamDefinition) -> Vec<CatalogEntry> {
        let mut entries = vec![CatalogEntry::new(
            &self.stream,
            &self.schema,
            self.key_properties.clone(),
            definition.replication_key.clone(),
            definition.replication_method,
        )];

        for (name, child) in &self.children {
            entries.push(
                CatalogEntry::new(
                    name,
                    &child.schema,
                    child.key_properties.clone(),
                    None,
                    ReplicationMethod::FullTable,
                )
                .with_parent(&self.stream),
            );
        }

        entries
    }
}

/// Array-of-objects field standing in for a child stream
fn promoted_array(child_schema: &FieldType) -> FieldType {
    let columns: BTreeMap<String, FieldType> = child_schema
        .properties
        .iter()
        .filter(|(name, _)| !name.starts_with(SDC_PREFIX))
        .map(|(name, field)| (name.clone(), field.clone()))
        .collect();

    FieldType::nullable(JsonType::Array).with_items(FieldType::object(nest_columns(&columns)))
}

/// Rebuild nested objects from flattened `a__b` column names
///
/// A column that also has `name__*` columns becomes a structured object, so
/// record values there are expanded the same way discovery expands them.
fn nest_columns(columns: &BTreeMap<String, FieldType>) -> BTreeMap<String, FieldType> {
    let mut nested = BTreeMap::new();
    let mut groups: BTreeMap<&str, BTreeMap<String, FieldType>> = BTreeMap::new();

    for (name, field) in columns {
        match name.split_once(SEPARATOR) {
            Some((head, rest)) if !head.is_empty() && !rest.is_empty() => {
                groups
                    .entry(head)
                    .or_default()
                    .insert(rest.to_string(), field.clone());
            }
            _ => {
                nested.insert(name.clone(), field.clone());
            }
        }
    }

    for (head, inner) in groups {
        let mut object = nested
            .remove(head)
            .unwrap_or_else(|| FieldType::nullable(JsonType::Object));
        object.kinds.insert(JsonType::Object);
        object.opaque = false;
        object.properties = nest_columns(&inner);
        nested.insert(head.to_string(), object);
    }

    nested
}
