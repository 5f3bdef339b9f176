//! Transport module
//!
//! The [`Transport`] capability turns a [`PageRequest`] into a decoded
//! [`Page`]. [`HttpTransport`] is the production implementation:
//!
//! - **Retries**: 429 honours `Retry-After`, 5xx and network failures back off
//!   exponentially, 401 triggers a single credential refresh
//! - **Rate Limiting**: optional token bucket using governor
//! - **Authentication**: delegated to [`crate::auth::Authenticator`]
//! - **POST**: params travel as a JSON body instead of the query string

mod client;
#[cfg(test)]
pub(crate) mod fixture;
mod rate_limit;
mod types;

pub use client::{parse_retry_after, HttpTransport, HttpTransportConfig, DEFAULT_RETRY_AFTER_SECS};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use types::{Page, PageRequest, Transport};
