//! Record extraction module
//!
//! Locates the record array inside a decoded response page.
//!
//! # Overview
//!
//! Extraction is a cascade, most specific first:
//!
//! 1. A top-level array is the record set.
//! 2. A configured records path is evaluated against the page.
//! 3. Well-known wrapper keys (`data`, `results`, `items`, ...) are probed,
//!    including one level of nesting.
//! 4. The top-level field holding the most objects wins.
//! 5. The whole page becomes a single record.
//!
//! Extraction never fails on an unexpected shape. The same [`PathExpr`]
//! evaluator is used by pagination to pull cursors and next links.

mod extractor;
mod path;

pub use extractor::{extract_records, RecordExtractor, WRAPPER_KEYS};
pub use path::{value_as_param, PathExpr};
