//! State management module
//!
//! Bookmarks are the only memory carried across runs. They are read and
//! written by the sync orchestrator alone; the state file is replaced
//! atomically on every checkpoint.

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamBookmarks};
