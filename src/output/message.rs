//! Singer message protocol

use crate::state::State;
use crate::types::JsonObject;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One line of the output stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
        #[serde(default)]
        bookmark_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: JsonObject,
        time_extracted: String,
    },
    State {
        value: Value,
    },
}

impl Message {
    /// SCHEMA message
    pub fn schema(
        stream: impl Into<String>,
        schema: Value,
        key_properties: Vec<String>,
        bookmark_properties: Vec<String>,
    ) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
            bookmark_properties,
        }
    }

    /// RECORD message stamped with an extraction time
    pub fn record(stream: impl Into<String>, record: JsonObject, extracted: DateTime<Utc>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: extracted.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// STATE message carrying a full state snapshot
    pub fn state(state: &State) -> Self {
        Self::State {
            value: state.to_value(),
        }
    }

    /// Stream this message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    /// Protocol type tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Schema { .. } => "SCHEMA",
            Self::Record { .. } => "RECORD",
            Self::State { .. } => "STATE",
        }
    }
}
