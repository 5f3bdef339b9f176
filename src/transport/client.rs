//! HTTP transport with retry, rate limiting and failure classification
//!
//! Each failed attempt is classified with [`classify_status`]:
//! - rate limited (429): wait for `Retry-After`, then retry
//! - transient (5xx, timeouts, connection errors): exponential backoff, then retry
//! - auth expired (401): refresh credentials once and retry
//! - anything else: returned immediately

use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::types::{Page, PageRequest, Transport};
use crate::auth::{AuthConfig, Authenticator};
use crate::error::{classify_status, Error, Result, TransportErrorKind};
use crate::types::{BackoffType, Method, StringMap};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Wait used when a 429 carries no usable `Retry-After`
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Body characters kept in error messages
const BODY_PREVIEW_CHARS: usize = 500;

/// Configuration for the HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL that relative stream paths are joined to
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,
    /// Initial delay for backoff
    pub initial_backoff: Duration,
    /// Maximum delay for backoff
    pub max_backoff: Duration,
    /// Type of backoff strategy
    pub backoff_type: BackoffType,
    /// Optional client-side rate limit
    pub rate_limit: Option<RateLimiterConfig>,
    /// Headers sent with every request; request headers win on conflict
    pub default_headers: StringMap,
    /// Params sent with every request; request params win on conflict
    pub default_params: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: Duration::from_secs(300),
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_type: BackoffType::Exponential,
            rate_limit: None,
            default_headers: StringMap::new(),
            default_params: StringMap::new(),
            user_agent: format!("rest-tap/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpTransportConfig {
    /// Create a config for an API base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set backoff configuration
    #[must_use]
    pub fn backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Set rate limiter
    #[must_use]
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Add a default header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Add a default param
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_params.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }
}

/// HTTP implementation of [`Transport`]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
    authenticator: Authenticator,
    rate_limiter: Option<RateLimiter>,
}

impl HttpTransport {
    /// Create a transport with authentication
    pub fn new(config: HttpTransportConfig, auth: AuthConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        let authenticator = Authenticator::with_client(auth, client.clone());

        Ok(Self {
            client,
            config,
            authenticator,
            rate_limiter,
        })
    }

    /// Resolve a stream path against the base URL
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    /// Calculate backoff delay for a given attempt
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let delay = match self.config.backoff_type {
            BackoffType::Constant => self.config.initial_backoff,
            BackoffType::Linear => self.config.initial_backoff * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.config.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.config.max_backoff)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let url = self.build_url(&request.url);
        let mut params = self.config.default_params.clone();
        params.extend(request.params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let max_retries = self.config.max_retries;
        let mut attempt = 0;
        let mut refreshed = false;

        loop {
            if let Some(limiter) = &self.rate_limiter {
                limiter.wait().await;
            }

            debug!(method = %request.method, url = %url, ?params, "Request");

            let error = match self.send_auth_checked(&url, request, &params).await? {
                Ok(response) if response.status().is_success() => {
                    return decode_page(response).await;
                }
                Ok(response) => status_error(response).await,
                Err(e) if e.is_timeout() => Error::Timeout {
                    timeout_ms: self.config.timeout.as_millis() as u64,
                },
                Err(e) => Error::Http(e),
            };

            match error.transport_kind() {
                TransportErrorKind::RateLimited if attempt < max_retries => {
                    let wait = match &error {
                        Error::RateLimited {
                            retry_after_seconds,
                        } => *retry_after_seconds,
                        _ => DEFAULT_RETRY_AFTER_SECS,
                    };
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        wait_secs = wait,
                        "Rate limited (429), waiting"
                    );
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                    attempt += 1;
                }
                TransportErrorKind::Transient if attempt < max_retries => {
                    let delay = self.calculate_backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = max_retries + 1,
                        ?delay,
                        error = %error,
                        "Transient failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                TransportErrorKind::AuthExpired
                    if !refreshed && self.authenticator.can_refresh() =>
                {
                    warn!("Got 401, refreshing credentials and retrying once");
                    self.authenticator.force_refresh().await;
                    refreshed = true;
                }
                TransportErrorKind::AuthExpired => {
                    let message = match &error {
                        Error::HttpStatus { body, .. } if refreshed => {
                            format!("authentication failed after token refresh: {body}")
                        }
                        Error::HttpStatus { body, .. } => {
                            format!("authentication failed (401): {body}")
                        }
                        other => other.to_string(),
                    };
                    return Err(Error::auth(message));
                }
                _ => return Err(error),
            }
        }
    }
}

impl HttpTransport {
    /// Send one attempt, separating credential failures from HTTP failures
    ///
    /// A failed token fetch is fatal and returned as the outer `Err`; network
    /// level failures are returned inside `Ok` so the retry loop can classify them.
    async fn send_auth_checked(
        &self,
        url: &str,
        request: &PageRequest,
        params: &StringMap,
    ) -> Result<std::result::Result<Response, reqwest::Error>> {
        let mut req = self
            .client
            .request(request.method.into(), url)
            .header(ACCEPT, "application/json");

        for (key, value) in self.config.default_headers.iter().chain(&request.headers) {
            req = req.header(key.as_str(), value.as_str());
        }

        req = match request.method {
            Method::GET if params.is_empty() => req,
            Method::GET => req.query(params),
            Method::POST => req.json(params),
        };

        let req = self.authenticator.apply(req).await?;
        Ok(req.send().await)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .field("authenticator", &self.authenticator)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Turn a non-success response into a classified error
async fn status_error(response: Response) -> Error {
    let status = response.status().as_u16();
    if classify_status(status) == TransportErrorKind::RateLimited {
        return Error::RateLimited {
            retry_after_seconds: parse_retry_after(response.headers()),
        };
    }
    let body = response.text().await.unwrap_or_default();
    Error::http_status(status, preview(&body, BODY_PREVIEW_CHARS))
}

/// Decode a successful response as JSON
async fn decode_page(response: Response) -> Result<Page> {
    let headers = response.headers().clone();
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let text = response.text().await.map_err(Error::Http)?;

    if text.trim().is_empty() {
        return Ok(Page::new(Value::Null).with_headers(headers));
    }

    let body: Value = serde_json::from_str(&text).map_err(|e| {
        Error::decode(format!(
            "expected JSON but got '{content_type}' ({e}); body preview: {}",
            preview(&text, 200)
        ))
    })?;
    Ok(Page::new(body).with_headers(headers))
}

/// Seconds to wait from a `Retry-After` header (delta-seconds or HTTP-date)
pub fn parse_retry_after(headers: &HeaderMap) -> u64 {
    let Some(raw) = headers.get(RETRY_AFTER).and_then(|v| v.to_str().ok()) else {
        return DEFAULT_RETRY_AFTER_SECS;
    };
    let raw = raw.trim();

    if let Ok(seconds) = raw.parse::<f64>() {
        return (seconds.floor() as u64).max(1);
    }

    if let Ok(when) = DateTime::parse_from_rfc2822(raw) {
        let wait = when.with_timezone(&Utc) - Utc::now();
        return (wait.num_seconds().max(1)) as u64;
    }

    warn!(
        value = raw,
        default_secs = DEFAULT_RETRY_AFTER_SECS,
        "Could not parse Retry-After, using default"
    );
    DEFAULT_RETRY_AFTER_SECS
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
