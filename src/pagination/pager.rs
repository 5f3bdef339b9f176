//! Pull-based page iteration
//!
//! [`PageStream`] fetches strictly one page at a time: every continuation
//! depends on the previous response, so there is no read-ahead.

use super::strategies::build_paginator;
use super::types::{NextPage, PaginationConfig, PaginationState, Paginator, MAX_PAGES};
use crate::error::Result;
use crate::extract::RecordExtractor;
use crate::transport::{Page, PageRequest, Transport};
use crate::types::{JsonObject, StringMap};
use tracing::{debug, warn};

/// A fetched page together with the records extracted from it
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// 1-based position in the sequence
    pub number: usize,
    pub page: Page,
    pub records: Vec<JsonObject>,
}

/// Lazy, finite sequence of pages for one stream
pub struct PageStream<'a> {
    transport: &'a dyn Transport,
    paginator: Box<dyn Paginator>,
    extractor: RecordExtractor,
    /// Request for the next page; `None` once the sequence has ended
    next_request: Option<PageRequest>,
    state: PaginationState,
    max_pages: usize,
    style: &'static str,
}

impl<'a> PageStream<'a> {
    /// Start a sequence at `request`, adding the strategy's initial params
    pub fn new(
        transport: &'a dyn Transport,
        config: &PaginationConfig,
        extractor: RecordExtractor,
        mut request: PageRequest,
    ) -> Result<Self> {
        let paginator = build_paginator(config)?;
        let mut state = PaginationState::new();
        request.params.extend(paginator.initial_params(&mut state));

        Ok(Self {
            transport,
            paginator,
            extractor,
            next_request: Some(request),
            state,
            max_pages: MAX_PAGES,
            style: config.style().as_str(),
        })
    }

    /// Override the page cap
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Fetch the next page, or `None` when the sequence has ended
    pub async fn next_page(&mut self) -> Result<Option<FetchedPage>> {
        let Some(request) = self.next_request.take() else {
            return Ok(None);
        };

        if self.state.pages >= self.max_pages {
            warn!(
                style = self.style,
                max_pages = self.max_pages,
                "Reached max page limit, stopping"
            );
            self.state.mark_done();
            return Ok(None);
        }

        let page = self.transport.fetch(&request).await?;
        self.state.pages += 1;
        let records = self.extractor.extract(&page.body);

        match self
            .paginator
            .process_response(&page, records.len(), &mut self.state)
        {
            NextPage::Done => {
                debug!(
                    style = self.style,
                    pages = self.state.pages,
                    records = self.state.total_fetched,
                    "Pagination complete"
                );
            }
            NextPage::Params(params) => {
                let mut next = request;
                next.params.extend(params);
                self.next_request = Some(next);
            }
            NextPage::Url(url) => {
                self.next_request = Some(PageRequest {
                    url,
                    params: StringMap::new(),
                    ..request
                });
            }
        }

        Ok(Some(FetchedPage {
            number: self.state.pages,
            page,
            records,
        }))
    }

    /// Pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.state.pages
    }

    /// Records extracted so far
    pub fn records_fetched(&self) -> u64 {
        self.state.total_fetched
    }

    /// True once no further request will be made
    pub fn is_finished(&self) -> bool {
        self.next_request.is_none()
    }
}

impl std::fmt::Debug for PageStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStream")
            .field("style", &self.style)
            .field("state", &self.state)
            .field("next_request", &self.next_request)
            .finish_non_exhaustive()
    }
}
