//! Auth configuration types
//!
//! These are resolved from the tap config before the first request is made.

use crate::types::StringMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before expiry at which a cached token is treated as stale
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when a token response carries no `expires_in`
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Where an API key is placed on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Sent as a header
    #[default]
    Header,
    /// Sent as a query parameter
    #[serde(alias = "query")]
    Param,
}

/// OAuth2 grant used against the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    /// Form value for `grant_type`
    pub fn as_str(self) -> &'static str {
        match self {
            GrantType::ClientCredentials => "client_credentials",
            GrantType::RefreshToken => "refresh_token",
        }
    }
}

/// OAuth2 token endpoint settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuth2Config {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub grant_type: GrantType,
    /// Required for the refresh-token grant; replaced when the server rotates it
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub audience: Option<String>,
    /// Merged into the token request form last
    pub extra_params: StringMap,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// Static API key in a header or query parameter
    ApiKey {
        /// Header or parameter name
        name: String,
        /// The key itself
        value: String,
        location: Location,
    },

    /// Static bearer token
    Bearer { token: String },

    /// HTTP Basic authentication
    Basic { username: String, password: String },

    /// OAuth2 with a cached, refreshable access token
    OAuth2(OAuth2Config),
}

impl AuthConfig {
    /// Short name used in logs
    pub fn method_name(&self) -> &'static str {
        match self {
            AuthConfig::None => "no_auth",
            AuthConfig::ApiKey { .. } => "api_key",
            AuthConfig::Bearer { .. } => "bearer_token",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::OAuth2(_) => "oauth2",
        }
    }
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired, refreshing a minute early
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
                Utc::now() + margin >= expires_at
            }
            None => false,
        }
    }
}
