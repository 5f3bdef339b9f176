//! Authenticator implementation
//!
//! Handles applying authentication to requests and managing token refresh.

use super::types::{
    AuthConfig, CachedToken, GrantType, Location, OAuth2Config, DEFAULT_TOKEN_LIFETIME_SECS,
};
use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Authenticator handles applying authentication to HTTP requests
pub struct Authenticator {
    /// Auth configuration
    config: AuthConfig,
    /// Cached OAuth2 access token
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    /// Current refresh token; the server may rotate it on every exchange
    refresh_token: Arc<RwLock<Option<String>>>,
    /// HTTP client for token requests
    http_client: Client,
}

impl Authenticator {
    /// Create a new authenticator with the given config
    pub fn new(config: AuthConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an authenticator with a custom HTTP client
    pub fn with_client(config: AuthConfig, http_client: Client) -> Self {
        let refresh_token = match &config {
            AuthConfig::OAuth2(oauth) => oauth.refresh_token.clone(),
            _ => None,
        };
        Self {
            config,
            cached_token: Arc::new(RwLock::new(None)),
            refresh_token: Arc::new(RwLock::new(refresh_token)),
            http_client,
        }
    }

    /// Apply authentication to a request builder
    pub async fn apply(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match &self.config {
            AuthConfig::None => Ok(req),

            AuthConfig::ApiKey {
                name,
                value,
                location,
            } => match location {
                Location::Header => Ok(req.header(name.as_str(), value.as_str())),
                Location::Param => Ok(req.query(&[(name.as_str(), value.as_str())])),
            },

            AuthConfig::Bearer { token } => Ok(req.bearer_auth(token)),

            AuthConfig::Basic { username, password } => {
                Ok(req.basic_auth(username, Some(password)))
            }

            AuthConfig::OAuth2(oauth) => {
                let token = self.get_or_refresh_token(oauth).await?;
                Ok(req.bearer_auth(token))
            }
        }
    }

    /// Whether a 401 can be recovered from by fetching a new token
    pub fn can_refresh(&self) -> bool {
        matches!(self.config, AuthConfig::OAuth2(_))
    }

    /// Drop the cached token so the next request fetches a fresh one
    pub async fn force_refresh(&self) {
        let mut cached = self.cached_token.write().await;
        *cached = None;
    }

    /// Get the current auth config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Current refresh token, including any rotation by the server
    pub async fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token.read().await.clone()
    }

    /// Get a valid token, refreshing if necessary
    async fn get_or_refresh_token(&self, oauth: &OAuth2Config) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Ok(token.token.clone());
                }
            }
        }

        let mut cached = self.cached_token.write().await;

        // Another task may have refreshed while we waited for the lock
        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.token.clone());
            }
        }

        let new_token = self.fetch_oauth2_token(oauth).await?;
        let token_str = new_token.token.clone();
        *cached = Some(new_token);

        Ok(token_str)
    }

    /// Exchange credentials for an access token
    async fn fetch_oauth2_token(&self, oauth: &OAuth2Config) -> Result<CachedToken> {
        let mut form = vec![
            ("grant_type".to_string(), oauth.grant_type.as_str().to_string()),
            ("client_id".to_string(), oauth.client_id.clone()),
            ("client_secret".to_string(), oauth.client_secret.clone()),
        ];

        if oauth.grant_type == GrantType::RefreshToken {
            let refresh_token = self.refresh_token.read().await.clone().ok_or_else(|| {
                Error::auth("oauth2_refresh_token is required for the refresh_token grant")
            })?;
            form.push(("refresh_token".to_string(), refresh_token));
        }
        if let Some(scope) = &oauth.scope {
            form.push(("scope".to_string(), scope.clone()));
        }
        if let Some(audience) = &oauth.audience {
            form.push(("audience".to_string(), audience.clone()));
        }
        for (key, value) in &oauth.extra_params {
            form.push((key.clone(), value.clone()));
        }

        info!(
            token_url = %oauth.token_url,
            grant_type = oauth.grant_type.as_str(),
            "Requesting OAuth2 token"
        );

        let response = self
            .http_client
            .post(&oauth.token_url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = format!("Token request failed with status {status}: {body}");
            return Err(match oauth.grant_type {
                GrantType::ClientCredentials => Error::OAuth2 { message },
                GrantType::RefreshToken => Error::TokenRefresh { message },
            });
        }

        let token_response: TokenResponse = response.json().await.map_err(Error::Http)?;

        if let Some(rotated) = token_response.refresh_token {
            debug!("Refresh token rotated by server");
            *self.refresh_token.write().await = Some(rotated);
        }

        let lifetime = token_response
            .expires_in
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        info!(expires_in = lifetime, "OAuth2 token acquired");
        Ok(CachedToken::expires_in(token_response.access_token, lifetime))
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("method", &self.config.method_name())
            .finish_non_exhaustive()
    }
}

/// OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}
