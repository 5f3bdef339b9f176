//! Schema types
//!
//! A [`FieldType`] is a set of JSON kinds plus the nested shape observed for
//! objects and arrays. Field types form a join-semilattice under
//! [`FieldType::merge`]: the operation is commutative, associative and
//! idempotent, so the order in which samples are observed never matters.

use crate::error::{Error, Result};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Format tag attached to date-time looking strings
pub const DATE_TIME_FORMAT: &str = "date-time";

/// JSON Schema primitive kind
///
/// Declaration order is the order kinds are written in a `"type"` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Object,
    Array,
}

impl JsonType {
    /// JSON Schema name of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }

    /// Parse a JSON Schema kind name
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "null" => Some(JsonType::Null),
            "boolean" => Some(JsonType::Boolean),
            "integer" => Some(JsonType::Integer),
            "number" => Some(JsonType::Number),
            "string" => Some(JsonType::String),
            "object" => Some(JsonType::Object),
            "array" => Some(JsonType::Array),
            _ => None,
        }
    }

    /// Kind of a concrete JSON value
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonType::Null,
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => JsonType::Integer,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Object(_) => JsonType::Object,
            Value::Array(_) => JsonType::Array,
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed type of one field position
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldType {
    /// Kinds seen at this position
    pub kinds: BTreeSet<JsonType>,
    /// Semantic format, kept only while every observation agrees
    pub format: Option<String>,
    /// Nested fields, meaningful when `kinds` contains `Object`
    pub properties: BTreeMap<String, FieldType>,
    /// Set when object shape was dropped (depth cap, or a schema without
    /// `properties`); such objects are carried as JSON text
    pub opaque: bool,
    /// Element type, meaningful when `kinds` contains `Array`
    pub items: Option<Box<FieldType>>,
}

/// Schema of a whole stream: an object-kinded root `FieldType`
pub type InferredSchema = FieldType;

impl FieldType {
    /// Field type with the given kinds and nothing else
    pub fn of_kinds(kinds: impl IntoIterator<Item = JsonType>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            ..Default::default()
        }
    }

    /// `{null, kind}`
    pub fn nullable(kind: JsonType) -> Self {
        Self::of_kinds([JsonType::Null, kind])
    }

    /// Nullable object with the given properties
    pub fn object(properties: BTreeMap<String, FieldType>) -> Self {
        Self {
            properties,
            ..Self::nullable(JsonType::Object)
        }
    }

    /// Attach a format tag
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Attach an element type
    #[must_use]
    pub fn with_items(mut self, items: FieldType) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Check whether a kind was observed
    pub fn has(&self, kind: JsonType) -> bool {
        self.kinds.contains(&kind)
    }

    /// Object with a known (possibly empty) shape
    pub fn is_structured_object(&self) -> bool {
        self.has(JsonType::Object) && !self.opaque
    }

    /// Array whose elements are objects with at least one known property
    pub fn is_array_of_objects(&self) -> bool {
        self.has(JsonType::Array)
            && self.items.as_deref().is_some_and(|items| {
                items.is_structured_object() && !items.properties.is_empty()
            })
    }

    /// Look up a nested property
    pub fn property(&self, name: &str) -> Option<&FieldType> {
        self.properties.get(name)
    }

    /// Union of two observations
    #[must_use]
    pub fn merge(&self, other: &FieldType) -> FieldType {
        let kinds = self.kinds.union(&other.kinds).copied().collect();

        let format = if self.format == other.format {
            self.format.clone()
        } else {
            None
        };

        let mut properties = self.properties.clone();
        for (key, theirs) in &other.properties {
            let merged = match properties.get(key) {
                Some(ours) => ours.merge(theirs),
                None => theirs.clone(),
            };
            properties.insert(key.clone(), merged);
        }

        let items = match (&self.items, &other.items) {
            (Some(a), Some(b)) => Some(Box::new(a.merge(b))),
            (Some(a), None) => Some(a.clone()),
            (None, Some(b)) => Some(b.clone()),
            (None, None) => None,
        };

        FieldType {
            kinds,
            format,
            properties,
            opaque: self.opaque || other.opaque,
            items,
        }
    }

    /// Merge in place
    pub fn absorb(&mut self, other: &FieldType) {
        *self = self.merge(other);
    }

    // ========================================================================
    // JSON Schema conversion
    // ========================================================================

    /// Render as a JSON Schema document
    pub fn to_json_schema(&self) -> Value {
        let mut out = Map::new();

        let kinds: Vec<Value> = self.kinds.iter().map(|k| json!(k.as_str())).collect();
        if !kinds.is_empty() {
            out.insert("type".to_string(), Value::Array(kinds));
        }
        if let Some(format) = &self.format {
            out.insert("format".to_string(), json!(format));
        }
        if self.is_structured_object() {
            let props: Map<String, Value> = self
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_schema()))
                .collect();
            out.insert("properties".to_string(), Value::Object(props));
        }
        if self.has(JsonType::Array) {
            let items = self
                .items
                .as_ref()
                .map_or_else(|| json!({}), |items| items.to_json_schema());
            out.insert("items".to_string(), items);
        }

        Value::Object(out)
    }

    /// Parse a JSON Schema document
    ///
    /// `"type"` may be a single name or an array of names. A schema with
    /// `properties` but no `type` is taken to be an object.
    pub fn from_json_schema(schema: &Value) -> Result<FieldType> {
        let Value::Object(map) = schema else {
            return Err(Error::schema(format!(
                "expected a JSON Schema object, found {schema}"
            )));
        };

        let mut kinds = BTreeSet::new();
        match map.get("type") {
            Some(Value::String(name)) => {
                kinds.insert(parse_kind(name)?);
            }
            Some(Value::Array(names)) => {
                for name in names {
                    let name = name
                        .as_str()
                        .ok_or_else(|| Error::schema(format!("invalid type entry {name}")))?;
                    kinds.insert(parse_kind(name)?);
                }
            }
            Some(other) => return Err(Error::schema(format!("invalid type {other}"))),
            None if map.contains_key("properties") => {
                kinds.insert(JsonType::Object);
            }
            None => {}
        }

        let mut properties = BTreeMap::new();
        let opaque = match map.get("properties") {
            Some(Value::Object(props)) => {
                for (key, prop) in props {
                    properties.insert(key.clone(), FieldType::from_json_schema(prop)?);
                }
                false
            }
            Some(other) => return Err(Error::schema(format!("invalid properties {other}"))),
            None => kinds.contains(&JsonType::Object),
        };

        let items = match map.get("items") {
            Some(items) if items.as_object().is_some_and(|m| !m.is_empty()) => {
                Some(Box::new(FieldType::from_json_schema(items)?))
            }
            _ => None,
        };

        Ok(FieldType {
            kinds,
            format: map.get("format").and_then(Value::as_str).map(String::from),
            properties,
            opaque,
            items,
        })
    }
}

fn parse_kind(name: &str) -> Result<JsonType> {
    JsonType::parse(name).ok_or_else(|| Error::schema(format!("unknown type '{name}'")))
}
