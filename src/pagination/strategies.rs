//! Pagination strategy implementations
//!
//! Each strategy handles a specific pagination pattern.

use super::types::{NextPage, PaginationConfig, PaginationState, Paginator};
use crate::error::Result;
use crate::extract::{value_as_param, PathExpr};
use crate::transport::Page;
use crate::types::StringMap;
use tracing::debug;

/// Body field OData services use for the next page
pub const ODATA_NEXT_LINK: &str = "@odata.nextLink";

/// Build the strategy for a config, compiling any path expressions once
pub fn build_paginator(config: &PaginationConfig) -> Result<Box<dyn Paginator>> {
    config.validate()?;
    Ok(match config {
        PaginationConfig::None => Box::new(NoPaginator),
        PaginationConfig::Page {
            page_param,
            size_param,
            page_size,
            start_page,
            total_path,
        } => Box::new(PageNumberPaginator {
            page_param: page_param.clone(),
            size_param: size_param.clone(),
            page_size: *page_size,
            start_page: *start_page,
            total_path: total_path.as_deref().map(PathExpr::parse).transpose()?,
        }),
        PaginationConfig::Offset {
            offset_param,
            limit_param,
            page_size,
        } => Box::new(OffsetPaginator {
            offset_param: offset_param.clone(),
            limit_param: limit_param.clone(),
            page_size: *page_size,
        }),
        PaginationConfig::Cursor {
            cursor_path,
            cursor_param,
        } => Box::new(CursorPaginator {
            cursor_path: PathExpr::parse(cursor_path)?,
            cursor_param: cursor_param.clone(),
        }),
        PaginationConfig::LinkHeader => Box::new(LinkHeaderPaginator),
        PaginationConfig::JsonPath {
            next_path,
            next_is_url,
            cursor_param,
        } => Box::new(JsonPathPaginator {
            next_path: PathExpr::parse(next_path)?,
            next_is_url: *next_is_url,
            cursor_param: cursor_param.clone(),
        }),
        PaginationConfig::OData => Box::new(ODataPaginator),
    })
}

// ============================================================================
// No Pagination
// ============================================================================

/// No pagination - single request
#[derive(Debug, Clone, Default)]
pub struct NoPaginator;

impl Paginator for NoPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> StringMap {
        StringMap::new()
    }

    fn process_response(
        &self,
        _page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);
        state.mark_done();
        NextPage::Done
    }
}

// ============================================================================
// Page Number Pagination
// ============================================================================

/// Page number pagination
///
/// Stops on a short page, or once `page * page_size` reaches the total count
/// when a total path is configured.
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    pub page_param: String,
    pub size_param: String,
    pub page_size: u64,
    pub start_page: u64,
    pub total_path: Option<PathExpr>,
}

impl PageNumberPaginator {
    fn params(&self, page: u64) -> StringMap {
        let mut params = StringMap::new();
        params.insert(self.page_param.clone(), page.to_string());
        params.insert(self.size_param.clone(), self.page_size.to_string());
        params
    }
}

impl Paginator for PageNumberPaginator {
    fn initial_params(&self, state: &mut PaginationState) -> StringMap {
        state.page = self.start_page;
        self.params(state.page)
    }

    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        if (records_count as u64) < self.page_size {
            state.mark_done();
            return NextPage::Done;
        }

        if let Some(path) = &self.total_path {
            let total = path
                .find_first(&page.body)
                .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok()));
            if let Some(total) = total.filter(|t| *t > 0) {
                if state.page * self.page_size >= total {
                    debug!(page = state.page, total, "Reached total count");
                    state.mark_done();
                    return NextPage::Done;
                }
            }
        }

        state.page += 1;
        NextPage::Params(self.params(state.page))
    }
}

// ============================================================================
// Offset Pagination
// ============================================================================

/// Offset/limit pagination; stops on a short page
#[derive(Debug, Clone)]
pub struct OffsetPaginator {
    pub offset_param: String,
    pub limit_param: String,
    pub page_size: u64,
}

impl OffsetPaginator {
    fn params(&self, offset: u64) -> StringMap {
        let mut params = StringMap::new();
        params.insert(self.offset_param.clone(), offset.to_string());
        params.insert(self.limit_param.clone(), self.page_size.to_string());
        params
    }
}

impl Paginator for OffsetPaginator {
    fn initial_params(&self, state: &mut PaginationState) -> StringMap {
        state.offset = 0;
        self.params(0)
    }

    fn process_response(
        &self,
        _page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        if (records_count as u64) < self.page_size {
            state.mark_done();
            return NextPage::Done;
        }

        state.offset += self.page_size;
        NextPage::Params(self.params(state.offset))
    }
}

// ============================================================================
// Cursor Pagination
// ============================================================================

/// Cursor-based pagination (e.g., Stripe, Slack)
///
/// The cursor is read from the body and sent back as a request param; an
/// absent or falsy cursor ends the sequence.
#[derive(Debug, Clone)]
pub struct CursorPaginator {
    pub cursor_path: PathExpr,
    pub cursor_param: String,
}

impl Paginator for CursorPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> StringMap {
        StringMap::new()
    }

    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        match self
            .cursor_path
            .find_first(&page.body)
            .as_ref()
            .and_then(value_as_param)
        {
            Some(cursor) => {
                state.cursor = Some(cursor.clone());
                NextPage::with_param(&self.cursor_param, cursor)
            }
            None => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}

// ============================================================================
// Link Header Pagination
// ============================================================================

/// Link header pagination (RFC 5988)
///
/// Format: `Link: <https://api.github.com/...?page=2>; rel="next", ...`
#[derive(Debug, Clone, Default)]
pub struct LinkHeaderPaginator;

impl Paginator for LinkHeaderPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> StringMap {
        StringMap::new()
    }

    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        if let Some(next_url) = page
            .header("link")
            .and_then(|header| parse_link_header(header, "next"))
        {
            return NextPage::with_url(next_url);
        }

        state.mark_done();
        NextPage::Done
    }
}

/// Parse a Link header and extract the URL for the given rel
pub fn parse_link_header(header: &str, target_rel: &str) -> Option<String> {
    for part in header.split(',') {
        let mut url = None;
        let mut rels: Vec<&str> = Vec::new();

        for segment in part.split(';') {
            let segment = segment.trim();
            if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                url = Some(inner);
            } else if let Some((key, value)) = segment.split_once('=') {
                if key.trim().eq_ignore_ascii_case("rel") {
                    // rel may list several space-separated relation types
                    rels.extend(value.trim().trim_matches(['"', '\'']).split_whitespace());
                }
            }
        }

        if let Some(u) = url {
            if rels.iter().any(|r| r.eq_ignore_ascii_case(target_rel)) {
                return Some(u.to_string());
            }
        }
    }

    None
}

// ============================================================================
// JSONPath Pagination
// ============================================================================

/// Next URL or token read from the body
///
/// Common patterns:
/// - `{ "next": "https://api.example.com/items?page=2" }`
/// - `{ "paging": { "next": "token-abc" } }` with `next_is_url: false`
#[derive(Debug, Clone)]
pub struct JsonPathPaginator {
    pub next_path: PathExpr,
    pub next_is_url: bool,
    pub cursor_param: String,
}

impl Paginator for JsonPathPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> StringMap {
        StringMap::new()
    }

    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        let Some(next) = self
            .next_path
            .find_first(&page.body)
            .as_ref()
            .and_then(value_as_param)
        else {
            state.mark_done();
            return NextPage::Done;
        };

        if self.next_is_url {
            NextPage::with_url(next)
        } else {
            state.cursor = Some(next.clone());
            NextPage::with_param(&self.cursor_param, next)
        }
    }
}

// ============================================================================
// OData Pagination
// ============================================================================

/// Follows `@odata.nextLink`, which carries the full next URL
#[derive(Debug, Clone, Default)]
pub struct ODataPaginator;

impl Paginator for ODataPaginator {
    fn initial_params(&self, _state: &mut PaginationState) -> StringMap {
        StringMap::new()
    }

    fn process_response(
        &self,
        page: &Page,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.add_fetched(records_count);

        match page.body.get(ODATA_NEXT_LINK).and_then(value_as_param) {
            Some(next_link) => NextPage::with_url(next_link),
            None => {
                state.mark_done();
                NextPage::Done
            }
        }
    }
}
