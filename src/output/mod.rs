//! Output module
//!
//! Singer-style message stream: SCHEMA, RECORD and STATE messages, one JSON
//! object per line.

mod message;
mod writer;

pub use message::Message;
pub use writer::{JsonLinesWriter, MemoryWriter, MessageWriter};
