//! Authentication module
//!
//! Supports: no auth, API key (header or query), Bearer, Basic, OAuth2
//!
//! The `Authenticator` applies credentials to outgoing requests and caches
//! OAuth2 access tokens until shortly before they expire.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{
    AuthConfig, CachedToken, GrantType, Location, OAuth2Config, DEFAULT_TOKEN_LIFETIME_SECS,
    TOKEN_REFRESH_MARGIN_SECS,
};

#[cfg(test)]
mod tests;
