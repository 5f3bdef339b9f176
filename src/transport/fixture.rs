//! Scripted transport for tests

use super::types::{Page, PageRequest, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Page(Page),
    Status(u16),
}

/// Replays scripted replies per URL and records every request
///
/// Once a route's script is exhausted its last reply repeats.
#[derive(Debug, Default)]
pub(crate) struct FixtureTransport {
    routes: BTreeMap<String, Vec<Reply>>,
    served: Mutex<BTreeMap<String, usize>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl FixtureTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve these bodies, in order, for `url`
    pub(crate) fn route(mut self, url: &str, bodies: Vec<Value>) -> Self {
        let replies = bodies.into_iter().map(|b| Reply::Page(Page::new(b)));
        self.routes.entry(url.to_string()).or_default().extend(replies);
        self
    }

    /// Serve full pages (with headers), in order, for `url`
    pub(crate) fn route_pages(mut self, url: &str, pages: Vec<Page>) -> Self {
        let replies = pages.into_iter().map(Reply::Page);
        self.routes.entry(url.to_string()).or_default().extend(replies);
        self
    }

    /// Fail every request to `url` with an HTTP status
    pub(crate) fn fail(mut self, url: &str, status: u16) -> Self {
        self.routes
            .entry(url.to_string())
            .or_default()
            .push(Reply::Status(status));
        self
    }

    pub(crate) fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for FixtureTransport {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        self.requests.lock().unwrap().push(request.clone());

        let script = self
            .routes
            .get(&request.url)
            .filter(|script| !script.is_empty())
            .ok_or_else(|| Error::http_status(404, format!("no route for {}", request.url)))?;

        let index = {
            let mut served = self.served.lock().unwrap();
            let count = served.entry(request.url.clone()).or_insert(0);
            let index = (*count).min(script.len() - 1);
            *count += 1;
            index
        };

        match &script[index] {
            Reply::Page(page) => Ok(page.clone()),
            Reply::Status(status) => Err(Error::http_status(*status, "scripted failure")),
        }
    }
}
