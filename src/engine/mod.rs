//! Sync engine module
//!
//! Stream orchestration for the `sync` command.
//!
//! # Overview
//!
//! Streams run strictly one after another, and so do the pages of a stream.
//! For each stream the engine:
//!
//! 1. marks it `currently_syncing` and emits STATE
//! 2. resolves the schema plan (from the catalog, or by discovery)
//! 3. reads the bookmark (INCREMENTAL only), falling back to `start_date`
//! 4. emits SCHEMA for the parent and every emitted child
//! 5. pages through the API, emitting each record and its child rows as
//!    soon as it is extracted, tracking the newest replication value
//! 6. checkpoints the bookmark every `checkpoint_interval` records and at
//!    the end of the stream
//!
//! A stream that fails is recorded as aborted and the run moves on. Output
//! and state persistence failures end the run.

mod compare;
mod transform;
mod types;

pub use compare::{compare_replication_values, is_newer, parse_datetime, replication_value};
pub use transform::conform;
pub use types::{
    StreamOutcome, StreamStats, SyncConfig, SyncSummary, DEFAULT_CHECKPOINT_INTERVAL,
};

use crate::catalog::{discover_stream, Catalog, StreamPlan};
use crate::config::{StreamDefinition, TapConfig};
use crate::error::{Error, Result};
use crate::extract::RecordExtractor;
use crate::output::{Message, MessageWriter};
use crate::pagination::PageStream;
use crate::schema::FieldType;
use crate::state::StateManager;
use crate::transport::Transport;
use crate::types::JsonObject;
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Sync engine for orchestrating data extraction
pub struct SyncEngine<'a> {
    /// Tap configuration
    config: &'a TapConfig,
    /// Page fetcher
    transport: &'a dyn Transport,
    /// Bookmark store
    state: StateManager,
    /// Run options
    options: SyncConfig,
}

impl<'a> SyncEngine<'a> {
    /// Create a new sync engine
    pub fn new(config: &'a TapConfig, transport: &'a dyn Transport, state: StateManager) -> Self {
        Self {
            config,
            transport,
            state,
            options: SyncConfig::default(),
        }
    }

    /// Set run options
    #[must_use]
    pub fn with_config(mut self, options: SyncConfig) -> Self {
        self.options = options;
        self
    }

    /// Get the state manager
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Run every selected stream
    ///
    /// With a catalog, only its selected parent entries run and only its
    /// selected children are emitted; without one, each stream is
    /// discovered first.
    pub async fn sync(
        &self,
        catalog: Option<&Catalog>,
        writer: &mut dyn MessageWriter,
    ) -> Result<SyncSummary> {
        let start = Instant::now();
        let streams = self.selected_streams(catalog)?;
        let mut summary = SyncSummary::default();

        if streams.is_empty() {
            warn!("No streams selected");
            return Ok(summary);
        }
        info!(streams = streams.len(), "Starting sync");

        for definition in streams {
            let span = info_span!("stream", stream = %definition.name);
            let result = self
                .sync_stream(definition, catalog, writer)
                .instrument(span)
                .await;

            let outcome = match result {
                Ok(stats) => StreamOutcome::Completed {
                    stream: definition.name.clone(),
                    stats,
                },
                Err(e @ (Error::Output { .. } | Error::State { .. })) => return Err(e),
                Err(e) => {
                    error!(stream = %definition.name, error = %e, "Stream aborted");
                    StreamOutcome::Aborted {
                        stream: definition.name.clone(),
                        error: e.to_string(),
                    }
                }
            };
            summary.outcomes.push(outcome);
        }

        self.state.set_currently_syncing(None).await;
        let snapshot = self.state.checkpoint().await?;
        writer.write(&Message::state(&snapshot))?;
        writer.flush()?;

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            completed = summary.completed().count(),
            aborted = summary.aborted().count(),
            duration_ms = summary.duration_ms,
            "Sync complete"
        );
        Ok(summary)
    }

    /// Configured streams in this run, in config order
    fn selected_streams(&self, catalog: Option<&Catalog>) -> Result<Vec<&'a StreamDefinition>> {
        for name in &self.options.streams {
            if self.config.stream(name).is_none() {
                return Err(Error::StreamNotFound {
                    stream: name.clone(),
                });
            }
        }

        if let Some(catalog) = catalog {
            for entry in catalog.selected() {
                if entry.parent_stream.is_none() && self.config.stream(&entry.stream).is_none() {
                    warn!(stream = %entry.stream, "No config found for stream, skipping");
                }
            }
        }

        Ok(self
            .config
            .streams
            .iter()
            .filter(|s| self.options.includes(&s.name))
            .filter(|s| match catalog {
                Some(catalog) => catalog.get(&s.name).is_some_and(|e| e.is_selected()),
                None => true,
            })
            .collect())
    }

    async fn sync_stream(
        &self,
        definition: &StreamDefinition,
        catalog: Option<&Catalog>,
        writer: &mut dyn MessageWriter,
    ) -> Result<StreamStats> {
        let name = definition.name.as_str();
        let start = Instant::now();

        self.state.set_currently_syncing(Some(name)).await;
        let snapshot = self.state.checkpoint().await?;
        writer.write(&Message::state(&snapshot))?;

        let plan = match catalog {
            Some(catalog) => StreamPlan::from_catalog(definition, catalog)?,
            None => discover_stream(self.config, self.transport, definition).await?,
        };

        if definition.has_full_table_replication_key() {
            warn!(
                replication_key = definition.replication_key.as_deref().unwrap_or_default(),
                "replication_key is set on a FULL_TABLE stream; syncing the full table"
            );
        }
        let replication_key = definition
            .replication_key
            .as_deref()
            .filter(|_| definition.is_incremental());

        let bookmark = match replication_key {
            Some(key) => self.initial_bookmark(name, key).await,
            None => None,
        };
        match (replication_key, &bookmark) {
            (Some(key), Some(value)) => info!(replication_key = key, bookmark = %value, "INCREMENTAL sync"),
            (Some(_), None) => info!("INCREMENTAL sync without bookmark, fetching all"),
            (None, _) => info!("FULL_TABLE sync"),
        }

        writer.write(&Message::schema(
            name,
            plan.schema().to_json_schema(),
            plan.key_properties().to_vec(),
            replication_key.map(|k| vec![k.to_string()]).unwrap_or_default(),
        ))?;
        for (child, child_plan) in plan.children() {
            writer.write(&Message::schema(
                child.as_str(),
                child_plan.schema.to_json_schema(),
                child_plan.key_properties.clone(),
                Vec::new(),
            ))?;
        }

        let request = self.config.stream_request(definition, bookmark.as_deref())?;
        let extractor = RecordExtractor::new(definition.records_path.as_deref())?;
        let pagination = definition.pagination()?;
        let mut pages = PageStream::new(self.transport, &pagination, extractor, request)?;

        let extracted_at = Utc::now();
        let mut stats = StreamStats::default();
        let mut max_value = bookmark;

        while let Some(page) = pages.next_page().await? {
            debug!(page = page.number, records = page.records.len(), "Processing page");

            for record in &page.records {
                let flat = plan.flatten(record);
                let row = conform_or_raw(&flat, plan.schema(), name, &mut stats);
                writer.write(&Message::record(name, row, extracted_at))?;
                stats.records += 1;

                for (child, rows) in plan.child_records(record) {
                    let child_schema = &plan.children()[child].schema;
                    for child_row in rows {
                        let row = conform_or_raw(&child_row, child_schema, child, &mut stats);
                        writer.write(&Message::record(child, row, extracted_at))?;
                        stats.add_child_record(child);
                    }
                }

                if let Some(key) = replication_key {
                    let value = flat
                        .get(key)
                        .or_else(|| record.get(key))
                        .and_then(replication_value);
                    if is_newer(value.as_deref(), max_value.as_deref()) {
                        max_value = value;
                    }
                }

                if self.options.checkpoint_interval > 0
                    && stats.records % self.options.checkpoint_interval == 0
                {
                    info!(records = stats.records, "Synced records so far");
                    if let (Some(key), Some(value)) = (replication_key, &max_value) {
                        self.state.set_bookmark(name, key, value.as_str()).await;
                        let snapshot = self.state.checkpoint().await?;
                        writer.write(&Message::state(&snapshot))?;
                        writer.flush()?;
                    }
                }
            }
        }
        stats.pages = pages.pages_fetched();

        if let (Some(key), Some(value)) = (replication_key, &max_value) {
            self.state.set_bookmark(name, key, value.as_str()).await;
            stats.bookmark = Some(value.clone());
        }
        let snapshot = self.state.checkpoint().await?;
        writer.write(&Message::state(&snapshot))?;
        writer.flush()?;

        info!(
            records = stats.records,
            pages = stats.pages,
            transform_failures = stats.transform_failures,
            duration_ms = start.elapsed().as_millis() as u64,
            "Stream complete"
        );
        for (child, count) in &stats.child_records {
            info!(child = %child, records = count, "Child stream complete");
        }

        Ok(stats)
    }

    /// Stored bookmark, else the configured start date
    async fn initial_bookmark(&self, stream: &str, key: &str) -> Option<String> {
        match self.state.get_bookmark(stream, key).await {
            Some(value) if !value.is_empty() => Some(value),
            _ => self.config.start_date.clone().filter(|d| !d.is_empty()),
        }
    }
}

fn conform_or_raw(
    record: &JsonObject,
    schema: &FieldType,
    stream: &str,
    stats: &mut StreamStats,
) -> JsonObject {
    match conform(record, schema) {
        Ok(row) => row,
        Err(e) => {
            warn!(stream, error = %e, "Record does not match schema, writing raw");
            stats.transform_failures += 1;
            record.clone()
        }
    }
}
