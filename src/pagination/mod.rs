//! Pagination module
//!
//! Supports: none, page number, offset, cursor, Link header, JSONPath next
//! value, OData next link
//!
//! # Overview
//!
//! A [`PaginationConfig`] is resolved once per stream into a [`Paginator`],
//! a pure continuation rule evaluated after each page. [`PageStream`] drives
//! it against a [`Transport`](crate::transport::Transport), extracting
//! records from every page so short-page detection counts exactly what the
//! sync emits. Iteration stops at [`MAX_PAGES`] with a warning.

mod pager;
mod strategies;
mod types;

pub use pager::{FetchedPage, PageStream};
pub use strategies::{
    build_paginator, parse_link_header, CursorPaginator, JsonPathPaginator, LinkHeaderPaginator,
    NoPaginator, ODataPaginator, OffsetPaginator, PageNumberPaginator, ODATA_NEXT_LINK,
};
pub use types::{
    NextPage, PaginationConfig, PaginationState, PaginationStyle, Paginator, MAX_PAGES,
};
