//! Discovery: sample, infer, denest
//!
//! Each configured stream either brings a static schema or is sampled
//! through the same request, pagination and extraction path sync uses.
//! Sampling failures never abort discovery; the stream gets an empty
//! object schema and the error is logged.

use super::plan::StreamPlan;
use super::types::Catalog;
use crate::config::{StreamDefinition, TapConfig};
use crate::error::Result;
use crate::extract::RecordExtractor;
use crate::pagination::PageStream;
use crate::schema::{FieldType, SchemaInferrer};
use crate::transport::Transport;
use crate::types::JsonObject;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Discover every configured stream
pub async fn discover(config: &TapConfig, transport: &dyn Transport) -> Result<Catalog> {
    let mut entries = Vec::new();

    for definition in &config.streams {
        info!(stream = %definition.name, "Discovering stream");
        if definition.has_full_table_replication_key() {
            warn!(
                stream = %definition.name,
                replication_key = definition.replication_key.as_deref().unwrap_or_default(),
                "replication_key is set on a FULL_TABLE stream; set replication_method to INCREMENTAL to use it"
            );
        }

        let plan = discover_stream(config, transport, definition).await?;
        for child in plan.children().keys() {
            info!(stream = %definition.name, child = %child, "Added child stream");
        }
        entries.extend(plan.catalog_entries(definition));
    }

    info!(streams = entries.len(), "Discovery complete");
    Ok(Catalog::new(entries))
}

/// Resolve one stream's schema and denesting plan
pub async fn discover_stream(
    config: &TapConfig,
    transport: &dyn Transport,
    definition: &StreamDefinition,
) -> Result<StreamPlan> {
    let raw = match &definition.schema {
        Some(schema) => {
            info!(stream = %definition.name, "Using static schema");
            FieldType::from_json_schema(schema)?
        }
        None => match sample_records(config, transport, definition).await {
            Ok(records) if records.is_empty() => {
                warn!(stream = %definition.name, "No sample records, using an empty schema");
                FieldType::object(BTreeMap::new())
            }
            Ok(records) => SchemaInferrer::new()
                .with_max_sample(config.max_sample)
                .infer(&records),
            Err(e) => {
                error!(stream = %definition.name, error = %e, "Failed to sample stream");
                FieldType::object(BTreeMap::new())
            }
        },
    };

    Ok(StreamPlan::discovered(definition, &raw))
}

/// Fetch up to `sample_size` records with page sizes clamped to the sample
pub async fn sample_records(
    config: &TapConfig,
    transport: &dyn Transport,
    definition: &StreamDefinition,
) -> Result<Vec<JsonObject>> {
    let limit = config.sample_size;
    let pagination = definition.pagination()?.clamp_page_size(limit as u64);
    let extractor = RecordExtractor::new(definition.records_path.as_deref())?;
    let request = config.stream_request(definition, None)?;

    let mut pages = PageStream::new(transport, &pagination, extractor, request)?;
    let mut records = Vec::new();

    while records.len() < limit {
        let Some(page) = pages.next_page().await? else {
            break;
        };
        records.extend(page.records);
    }
    records.truncate(limit);

    info!(
        stream = %definition.name,
        records = records.len(),
        pages = pages.pages_fetched(),
        "Fetched sample records"
    );
    Ok(records)
}
