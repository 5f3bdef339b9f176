//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `discover` - Sample streams and print the catalog
//! - `sync` - Extract records as a SCHEMA/RECORD/STATE message stream
//! - `validate` - Check the config without making requests

mod commands;
mod runner;

pub use commands::{parse_stream_list, Cli, Commands};
pub use runner::Runner;
