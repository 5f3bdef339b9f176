//! Engine types
//!
//! Options, per-stream statistics and the run summary.

use std::collections::BTreeMap;

/// Records between crash-recovery checkpoints
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 10_000;

/// Configuration for a sync run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Emitted parent records between bookmark checkpoints
    pub checkpoint_interval: u64,
    /// Streams to run; empty means every selected stream
    pub streams: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            streams: Vec::new(),
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checkpoint interval
    #[must_use]
    pub fn with_checkpoint_interval(mut self, records: u64) -> Self {
        self.checkpoint_interval = records;
        self
    }

    /// Restrict the run to the named streams
    #[must_use]
    pub fn with_streams(mut self, streams: Vec<String>) -> Self {
        self.streams = streams;
        self
    }

    /// Whether a stream is part of this run
    pub fn includes(&self, stream: &str) -> bool {
        self.streams.is_empty() || self.streams.iter().any(|s| s == stream)
    }
}

/// Statistics for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Parent records emitted
    pub records: u64,
    /// Records emitted per child stream
    pub child_records: BTreeMap<String, u64>,
    /// Pages fetched
    pub pages: usize,
    /// Records emitted raw after failing to conform
    pub transform_failures: u64,
    /// Bookmark written at the end of the stream
    pub bookmark: Option<String>,
}

impl StreamStats {
    /// Count one emitted child record
    pub fn add_child_record(&mut self, child: &str) {
        *self.child_records.entry(child.to_string()).or_default() += 1;
    }
}

/// How a stream's sync ended
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOutcome {
    Completed { stream: String, stats: StreamStats },
    Aborted { stream: String, error: String },
}

impl StreamOutcome {
    /// Stream name
    pub fn stream(&self) -> &str {
        match self {
            Self::Completed { stream, .. } | Self::Aborted { stream, .. } => stream,
        }
    }

    /// Check if the stream completed
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Result of a sync run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    /// One outcome per stream, in run order
    pub outcomes: Vec<StreamOutcome>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncSummary {
    /// Streams that completed
    pub fn completed(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_completed())
            .map(StreamOutcome::stream)
    }

    /// Streams that aborted
    pub fn aborted(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_completed())
            .map(StreamOutcome::stream)
    }

    /// True when no stream aborted
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(StreamOutcome::is_completed)
    }

    /// Stats for a completed stream
    pub fn stats(&self, stream: &str) -> Option<&StreamStats> {
        self.outcomes.iter().find_map(|o| match o {
            StreamOutcome::Completed { stream: s, stats } if s == stream => Some(stats),
            _ => None,
        })
    }
}
