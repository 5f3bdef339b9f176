//! Transport types
//!
//! The core consumes pages through the [`Transport`] trait so pagination and
//! sync can be driven by fixtures as easily as by a live HTTP server.

use crate::error::Result;
use crate::types::{Method, StringMap};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// One request for a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Absolute URL or a path relative to the API base
    pub url: String,
    /// Query parameters (GET) or JSON body fields (POST)
    pub params: StringMap,
    /// Per-request headers
    pub headers: StringMap,
    pub method: Method,
}

impl PageRequest {
    /// Create a GET request for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Replace all parameters
    #[must_use]
    pub fn with_params(mut self, params: StringMap) -> Self {
        self.params = params;
        self
    }

    /// Replace all headers
    #[must_use]
    pub fn with_headers(mut self, headers: StringMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the method
    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// A decoded response body and the headers link-based pagination needs
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub body: Value,
    pub headers: HeaderMap,
}

impl Page {
    /// A page with no interesting headers
    pub fn new(body: Value) -> Self {
        Self {
            body,
            headers: HeaderMap::new(),
        }
    }

    /// Attach response headers
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// A single header as text
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Fetches decoded pages
///
/// Implementations classify failures through
/// [`Error::transport_kind`](crate::error::Error::transport_kind) and own any
/// retry policy; callers treat an `Err` as final for the current stream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch and decode one page
    async fn fetch(&self, request: &PageRequest) -> Result<Page>;
}
