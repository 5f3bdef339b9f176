// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # rest-tap
//!
//! A config-driven REST ingestion engine that speaks the Singer message
//! protocol.
//!
//! ## Features
//!
//! - **Any REST API from config**: paths, params, headers and templates
//! - **Pluggable Auth**: API key, bearer, basic and OAuth2 with refresh
//! - **Seven Pagination Strategies**: page, offset, cursor, Link header,
//!   JSONPath, OData and none, capped at 10,000 pages
//! - **Schema Inference**: type unions merged across sampled records
//! - **Denesting**: nested objects flattened, arrays of objects promoted to
//!   child streams
//! - **Incremental Sync**: bookmarks with crash-recovery checkpoints
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rest_tap::{load_config, HttpTransport, JsonLinesWriter, StateManager, SyncEngine, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("tap.yaml")?;
//!     let transport = HttpTransport::new(config.transport_config(), config.auth()?)?;
//!
//!     let engine = SyncEngine::new(&config, &transport, StateManager::from_file("state.json")?);
//!     let mut writer = JsonLinesWriter::stdout();
//!     let summary = engine.sync(None, &mut writer).await?;
//!     assert!(summary.is_success());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Sync Engine                              │
//! │  discover() → Catalog     sync(catalog, state) → messages       │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │Transport │ Paginate  │   Extract     │  Schema   │   Denest    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ Auth     │ Page      │ JSONPath      │ Inference │ Flatten     │
//! │ Retry    │ Offset    │ Wrapper keys  │ Merge     │ Child       │
//! │ Backoff  │ Cursor    │ Largest array │ JSON      │ streams     │
//! │ Rate Lim │ Link/OData│               │ Schema    │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Template interpolation
pub mod template;

/// Record extraction and path expressions
pub mod extract;

/// Schema inference from JSON data
pub mod schema;

/// Flattening and child stream promotion
pub mod denest;

/// Authentication implementations
pub mod auth;

/// HTTP transport with retry and rate limiting
pub mod transport;

/// Pagination strategies
pub mod pagination;

/// State management and checkpointing
pub mod state;

/// Singer message output
pub mod output;

/// Discovery and catalog
pub mod catalog;

/// Sync orchestration
pub mod engine;

/// Tap configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use catalog::{discover, Catalog, CatalogEntry};
pub use config::{load_config, load_config_from_str, StreamDefinition, TapConfig};
pub use engine::{SyncConfig, SyncEngine, SyncSummary};
pub use output::{JsonLinesWriter, MemoryWriter, Message, MessageWriter};
pub use state::StateManager;
pub use transport::{HttpTransport, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
