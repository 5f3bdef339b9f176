//! Tap configuration
//!
//! # Overview
//!
//! - `TapConfig` - API URL, auth, transport settings and streams
//! - `StreamDefinition` - per-stream path, keys, replication and pagination
//! - `load_config` - parse (YAML or JSON) and validate before any request

mod loader;
mod types;

pub use loader::{load_config, load_config_from_str};
pub use types::{AuthMethod, StreamDefinition, TapConfig};
