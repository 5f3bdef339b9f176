//! Message sinks
//!
//! [`JsonLinesWriter`] writes one JSON object per line to any `Write`
//! (stdout in the binary); [`MemoryWriter`] keeps messages for callers that
//! consume them in-process.

use super::message::Message;
use crate::error::{Error, Result};
use std::io::{self, Write};

/// Destination for protocol messages
pub trait MessageWriter: Send {
    /// Write one message
    fn write(&mut self, message: &Message) -> Result<()>;

    /// Flush buffered output; called at checkpoints and at end of run
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Newline-delimited JSON writer
#[derive(Debug)]
pub struct JsonLinesWriter<W: Write> {
    inner: W,
    messages_written: usize,
}

impl<W: Write> JsonLinesWriter<W> {
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            messages_written: 0,
        }
    }

    /// Number of messages written so far
    #[must_use]
    pub fn messages_written(&self) -> usize {
        self.messages_written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.inner
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush output: {e}")))?;
        Ok(self.inner)
    }
}

impl JsonLinesWriter<io::BufWriter<io::Stdout>> {
    /// Buffered writer over stdout
    pub fn stdout() -> Self {
        Self::new(io::BufWriter::new(io::stdout()))
    }
}

impl<W: Write + Send> MessageWriter for JsonLinesWriter<W> {
    fn write(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.inner, message)
            .map_err(|e| Error::output(format!("Failed to serialize message: {e}")))?;
        self.inner
            .write_all(b"\n")
            .map_err(|e| Error::output(format!("Failed to write message: {e}")))?;
        self.messages_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner
            .flush()
            .map_err(|e| Error::output(format!("Failed to flush output: {e}")))
    }
}

/// Collects messages in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    messages: Vec<Message>,
}

impl MemoryWriter {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message written, in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// RECORD payloads for one stream, in order
    pub fn records(&self, stream: &str) -> Vec<&crate::types::JsonObject> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// STATE payloads, in order
    pub fn states(&self) -> Vec<&serde_json::Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl MessageWriter for MemoryWriter {
    fn write(&mut self, message: &Message) -> Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}
