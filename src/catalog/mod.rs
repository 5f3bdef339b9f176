//! Discovery and catalog module
//!
//! # Overview
//!
//! - `discover` - sample each stream, infer its schema and denest it into a
//!   `Catalog` of parent and child entries
//! - `StreamPlan` - the schema and denesting plan sync runs with, built from
//!   discovery or from a catalog document
//! - `Catalog` / `CatalogEntry` - the catalog document with Singer metadata

mod discover;
mod plan;
mod types;

pub use discover::{discover, discover_stream, sample_records};
pub use plan::{ChildPlan, StreamPlan};
pub use types::{Catalog, CatalogEntry, MetadataEntry, SDC_PREFIX};

#[cfg(test)]
mod tests;
