//! Pagination types and traits
//!
//! Defines the core pagination abstractions used by all strategies.

use crate::error::{Error, Result};
use crate::transport::Page;
use crate::types::StringMap;
use std::fmt;

/// Hard cap on pages fetched for one stream
pub const MAX_PAGES: usize = 10_000;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Same URL, with these params added or replaced
    Params(StringMap),
    /// Replace the URL; its query string carries everything, so params are dropped
    Url(String),
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with a single parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = StringMap::new();
        params.insert(key.into(), value.into());
        Self::Params(params)
    }

    /// Create a continuation with a new URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }
}

/// Strategy names accepted in stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStyle {
    #[default]
    None,
    Page,
    Offset,
    Cursor,
    LinkHeader,
    JsonPath,
    OData,
}

impl PaginationStyle {
    /// Every supported style
    pub const ALL: [PaginationStyle; 7] = [
        PaginationStyle::None,
        PaginationStyle::Page,
        PaginationStyle::Offset,
        PaginationStyle::Cursor,
        PaginationStyle::LinkHeader,
        PaginationStyle::JsonPath,
        PaginationStyle::OData,
    ];

    /// Look a style up by its configuration name
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == name)
    }

    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            PaginationStyle::None => "none",
            PaginationStyle::Page => "page",
            PaginationStyle::Offset => "offset",
            PaginationStyle::Cursor => "cursor",
            PaginationStyle::LinkHeader => "link_header",
            PaginationStyle::JsonPath => "jsonpath",
            PaginationStyle::OData => "odata",
        }
    }
}

impl fmt::Display for PaginationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for pagination behavior
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaginationConfig {
    /// Single request
    #[default]
    None,

    /// Page number pagination (`?page=2&per_page=100`)
    Page {
        page_param: String,
        size_param: String,
        page_size: u64,
        start_page: u64,
        /// Path to a total record count in the body
        total_path: Option<String>,
    },

    /// Offset pagination (`?offset=200&limit=100`)
    Offset {
        offset_param: String,
        limit_param: String,
        page_size: u64,
    },

    /// Cursor taken from the body and sent back as a param
    Cursor {
        cursor_path: String,
        cursor_param: String,
    },

    /// RFC 5988 `Link: <...>; rel="next"`
    LinkHeader,

    /// Next URL or token taken from the body
    JsonPath {
        next_path: String,
        /// When false the value is sent as `cursor_param` instead
        next_is_url: bool,
        cursor_param: String,
    },

    /// `@odata.nextLink` in the body
    OData,
}

impl PaginationConfig {
    /// Page pagination with default param names
    pub fn page(page_size: u64) -> Self {
        Self::Page {
            page_param: "page".to_string(),
            size_param: "per_page".to_string(),
            page_size,
            start_page: 1,
            total_path: None,
        }
    }

    /// Offset pagination with default param names
    pub fn offset(page_size: u64) -> Self {
        Self::Offset {
            offset_param: "offset".to_string(),
            limit_param: "limit".to_string(),
            page_size,
        }
    }

    /// Cursor pagination
    pub fn cursor(cursor_path: impl Into<String>, cursor_param: impl Into<String>) -> Self {
        Self::Cursor {
            cursor_path: cursor_path.into(),
            cursor_param: cursor_param.into(),
        }
    }

    /// Next-URL pagination via a body path
    pub fn next_url(next_path: impl Into<String>) -> Self {
        Self::JsonPath {
            next_path: next_path.into(),
            next_is_url: true,
            cursor_param: "cursor".to_string(),
        }
    }

    /// The style this config belongs to
    pub fn style(&self) -> PaginationStyle {
        match self {
            Self::None => PaginationStyle::None,
            Self::Page { .. } => PaginationStyle::Page,
            Self::Offset { .. } => PaginationStyle::Offset,
            Self::Cursor { .. } => PaginationStyle::Cursor,
            Self::LinkHeader => PaginationStyle::LinkHeader,
            Self::JsonPath { .. } => PaginationStyle::JsonPath,
            Self::OData => PaginationStyle::OData,
        }
    }

    /// Page size for styles that have one
    pub fn page_size(&self) -> Option<u64> {
        match self {
            Self::Page { page_size, .. } | Self::Offset { page_size, .. } => Some(*page_size),
            _ => None,
        }
    }

    /// Copy of this config with the page size clamped (used for sampling)
    #[must_use]
    pub fn clamp_page_size(&self, max: u64) -> Self {
        let mut config = self.clone();
        match &mut config {
            Self::Page { page_size, .. } | Self::Offset { page_size, .. } => {
                *page_size = (*page_size).min(max).max(1);
            }
            _ => {}
        }
        config
    }

    /// Reject settings no strategy could make progress with
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Page { page_size: 0, .. } | Self::Offset { page_size: 0, .. } => Err(
                Error::invalid_value("pagination_page_size", "must be greater than zero"),
            ),
            _ => Ok(()),
        }
    }
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Current page number (page style)
    pub page: u64,
    /// Current offset (offset style)
    pub offset: u64,
    /// Last cursor sent
    pub cursor: Option<String>,
    /// Records seen so far
    pub total_fetched: u64,
    /// Pages fetched so far
    pub pages: usize,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Add to total fetched
    pub fn add_fetched(&mut self, count: usize) {
        self.total_fetched += count as u64;
    }
}

/// Continuation rule for one strategy
pub trait Paginator: Send + Sync {
    /// Params for the first request
    fn initial_params(&self, state: &mut PaginationState) -> StringMap;

    /// Decide what follows a fetched page
    ///
    /// `records_count` comes from the stream's record extractor so short-page
    /// detection sees the same records the sync does.
    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}
