//! Schema inference module
//!
//! Builds a recursive schema from sample records.
//!
//! # Features
//!
//! - **Type unions**: every observed kind is kept, `null` always included
//! - **Date-time heuristic**: ISO 8601 looking strings get `format: date-time`
//! - **Order independence**: observations merge through a commutative,
//!   associative and idempotent union
//! - **Depth cap**: object shape below the cap is dropped, not an error

mod inference;
mod types;

pub use inference::{
    infer_schema, looks_like_datetime, SchemaInferrer, ARRAY_SAMPLE, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_SAMPLE,
};
pub use types::{FieldType, InferredSchema, JsonType, DATE_TIME_FORMAT};

#[cfg(test)]
mod tests;
