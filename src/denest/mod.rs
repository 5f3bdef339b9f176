//! Denesting module
//!
//! Turns nested JSON into flat rows.
//!
//! Nested objects are flattened into `parent__child` columns. Top-level
//! arrays of objects are promoted to child streams named `{stream}__{field}`,
//! linked back to the parent through `_sdc_source_key_*` columns and an
//! `_sdc_sequence` position. Arrays of scalars stay on the parent as JSON
//! text.

mod children;
mod denester;
mod flatten;

pub use children::{
    extract_child_records, identify_child_streams, source_key_column, ChildStream,
    SEQUENCE_COLUMN, SOURCE_KEY_PREFIX,
};
pub use denester::Denester;
pub use flatten::{flatten_record, flatten_schema, to_json_text, SEPARATOR};

#[cfg(test)]
mod tests;
