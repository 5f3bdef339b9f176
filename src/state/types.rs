//! Bookmark state carried between runs
//!
//! Serialized in the Singer shape:
//! `{"bookmarks": {stream: {key: value}}, "currently_syncing": name|null}`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Bookmarks for one stream, keyed by replication key name
pub type StreamBookmarks = BTreeMap<String, String>;

/// Persisted sync state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Last seen replication value per stream and key
    #[serde(default, deserialize_with = "lenient_bookmarks")]
    pub bookmarks: BTreeMap<String, StreamBookmarks>,

    /// Stream being synced when this state was written
    #[serde(default)]
    pub currently_syncing: Option<String>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Bookmark for a stream's replication key
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks.get(stream)?.get(key).map(String::as_str)
    }

    /// Set the bookmark for a stream's replication key
    pub fn set_bookmark(&mut self, stream: &str, key: &str, value: impl Into<String>) {
        self.bookmarks
            .entry(stream.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Set or clear `currently_syncing`
    pub fn set_currently_syncing(&mut self, stream: Option<&str>) {
        self.currently_syncing = stream.map(ToString::to_string);
    }

    /// JSON value used as the body of a STATE message
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Accept bookmark values of any scalar type; other taps write numbers
fn lenient_bookmarks<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, StreamBookmarks>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, BTreeMap<String, Value>>> =
        Option::deserialize(deserializer)?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(stream, keys)| {
            let keys = keys
                .into_iter()
                .filter_map(|(key, value)| {
                    let value = match value {
                        Value::Null => return None,
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    Some((key, value))
                })
                .collect();
            (stream, keys)
        })
        .collect())
}
