//! Configuration types
//!
//! One document configures the whole tap: API base URL, authentication,
//! transport settings and the list of streams. Unknown top-level keys are
//! kept so templates can reference them (`{{ config.account_id }}`).

use crate::auth::{GrantType, Location};
use crate::types::{JsonValue, Method, ReplicationMethod, StringMap};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Tap Config
// ============================================================================

/// Top-level tap configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapConfig {
    /// Base URL that stream paths are joined to
    pub api_url: String,

    /// Stream definitions
    pub streams: Vec<StreamDefinition>,

    /// Bookmark used by INCREMENTAL streams that have none yet
    #[serde(default)]
    pub start_date: Option<String>,

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------
    #[serde(default)]
    pub auth_method: AuthMethod,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_api_key_name")]
    pub api_key_name: String,

    #[serde(default)]
    pub api_key_location: Location,

    #[serde(default)]
    pub bearer_token: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub oauth2_token_url: Option<String>,

    #[serde(default)]
    pub oauth2_client_id: Option<String>,

    #[serde(default)]
    pub oauth2_client_secret: Option<String>,

    #[serde(default)]
    pub oauth2_grant_type: GrantType,

    #[serde(default)]
    pub oauth2_refresh_token: Option<String>,

    #[serde(default)]
    pub oauth2_scope: Option<String>,

    #[serde(default)]
    pub oauth2_audience: Option<String>,

    #[serde(default, deserialize_with = "lenient_string_map")]
    pub oauth2_extra_params: StringMap,

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------
    /// Headers sent with every request
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub headers: StringMap,

    /// Params sent with every request
    #[serde(default, deserialize_with = "lenient_string_map")]
    pub params: StringMap,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,

    #[serde(default)]
    pub http_method: Method,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Client-side request rate cap
    #[serde(default)]
    pub rate_limit_rps: Option<u32>,

    // ------------------------------------------------------------------------
    // Discovery
    // ------------------------------------------------------------------------
    /// Records fetched per stream during discovery
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Records examined by schema inference
    #[serde(default = "default_max_sample")]
    pub max_sample: usize,

    /// Any other keys, visible to templates
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

fn default_api_key_name() -> String {
    "X-API-Key".to_string()
}

fn default_user_agent() -> String {
    format!("rest-tap/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    5
}

fn default_sample_size() -> usize {
    200
}

fn default_max_sample() -> usize {
    crate::schema::DEFAULT_MAX_SAMPLE
}

/// Authentication strategy names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthMethod {
    #[default]
    #[serde(rename = "no_auth", alias = "none")]
    NoAuth,
    #[serde(rename = "api_key")]
    ApiKey,
    #[serde(rename = "bearer_token", alias = "bearer")]
    BearerToken,
    #[serde(rename = "basic")]
    Basic,
    #[serde(rename = "oauth2")]
    OAuth2,
}

// ============================================================================
// Stream Definition
// ============================================================================

/// One configured stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamDefinition {
    /// Unique stream name
    pub name: String,

    /// Path joined to `api_url`, or an absolute URL; may contain templates
    #[serde(default, alias = "url")]
    pub path: String,

    #[serde(default)]
    pub primary_keys: Vec<String>,

    #[serde(default)]
    pub replication_key: Option<String>,

    #[serde(default)]
    pub replication_method: ReplicationMethod,

    /// Where the records live in each response; auto-detected when absent
    #[serde(default)]
    pub records_path: Option<String>,

    #[serde(default, deserialize_with = "lenient_string_map")]
    pub params: StringMap,

    #[serde(default, deserialize_with = "lenient_string_map")]
    pub headers: StringMap,

    // ------------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------------
    #[serde(default = "default_pagination_style")]
    pub pagination_style: String,

    #[serde(default = "default_page_param")]
    pub pagination_page_param: String,

    #[serde(default = "default_size_param")]
    pub pagination_size_param: String,

    #[serde(default = "default_page_size")]
    pub pagination_page_size: u64,

    #[serde(default = "default_start_page")]
    pub pagination_start_page: u64,

    #[serde(default)]
    pub pagination_total_path: Option<String>,

    #[serde(default = "default_offset_param")]
    pub pagination_offset_param: String,

    #[serde(default = "default_limit_param")]
    pub pagination_limit_param: String,

    #[serde(default = "default_cursor_path")]
    pub pagination_cursor_path: String,

    #[serde(default = "default_cursor_param")]
    pub pagination_cursor_param: String,

    #[serde(default = "default_next_path")]
    pub pagination_next_path: String,

    #[serde(default = "default_true")]
    pub pagination_next_is_url: bool,

    // ------------------------------------------------------------------------
    // Schema and bookmarks
    // ------------------------------------------------------------------------
    /// Static JSON Schema; skips inference
    #[serde(default)]
    pub schema: Option<JsonValue>,

    /// Flatten objects and promote arrays of objects to child streams
    #[serde(default = "default_true")]
    pub denest: bool,

    /// Param carrying the bookmark; defaults to the replication key
    #[serde(default)]
    pub bookmark_param: Option<String>,

    /// Template rendered with `{{ bookmark }}`
    #[serde(default)]
    pub bookmark_filter: Option<String>,

    /// Param the rendered `bookmark_filter` is sent under
    #[serde(default)]
    pub bookmark_filter_param: Option<String>,
}

fn default_pagination_style() -> String {
    "none".to_string()
}

fn default_page_param() -> String {
    "page".to_string()
}

fn default_size_param() -> String {
    "per_page".to_string()
}

fn default_page_size() -> u64 {
    100
}

fn default_start_page() -> u64 {
    1
}

fn default_offset_param() -> String {
    "offset".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_cursor_path() -> String {
    "$.next_cursor".to_string()
}

fn default_cursor_param() -> String {
    "cursor".to_string()
}

fn default_next_path() -> String {
    "$.next".to_string()
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Helpers
// ============================================================================

/// Accept scalar values in string maps (`limit: 50`, `active: true`)
fn lenient_string_map<'de, D>(deserializer: D) -> Result<StringMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, JsonValue>> = Option::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                JsonValue::String(s) => s,
                JsonValue::Number(n) => n.to_string(),
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Null => String::new(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "value for '{key}' must be a scalar, got {other}"
                    )))
                }
            };
            Ok((key, value))
        })
        .collect()
}
