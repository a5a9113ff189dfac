//! Message sink module
//!
//! The downstream boundary of a read. The coordinator is the only caller,
//! so sinks need no internal synchronisation.

use crate::engine::Message;
use crate::error::{Error, Result};
use crate::state::StateManager;
use crate::types::{LogLevel, StreamStatus};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;

/// Receives records, checkpoints, errors and status messages
#[async_trait]
pub trait MessageSink: Send {
    /// Accept one message
    async fn accept(&mut self, message: Message) -> Result<()>;

    /// Flush buffered output; called once when the read ends
    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    async fn accept(&mut self, message: Message) -> Result<()> {
        (**self).accept(message).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }
}

// ============================================================================
// Collecting Sink
// ============================================================================

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Vec<Message>,
}

impl CollectingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in arrival order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Take the collected messages
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Record payloads for a stream, in arrival order
    pub fn records(&self, stream: &str) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record(r) if r.stream == stream => Some(&r.data),
                _ => None,
            })
            .collect()
    }

    /// Checkpoints for a stream, in emission order
    pub fn states(&self, stream: &str) -> Vec<&Value> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { stream: s, data } if s == stream => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Error messages for a stream
    pub fn errors(&self, stream: &str) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Error { stream: s, message } if s == stream => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Status transitions for a stream
    pub fn statuses(&self, stream: &str) -> Vec<StreamStatus> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::StreamStatus { stream: s, status } if s == stream => Some(*status),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessageSink for CollectingSink {
    async fn accept(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        Ok(())
    }
}

// ============================================================================
// Writer Sink
// ============================================================================

/// Line format for `WriterSink`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineFormat {
    /// One JSON message per line
    #[default]
    Json,
    /// Human-readable lines
    Pretty,
}

/// Writes one line per message
#[derive(Debug)]
pub struct WriterSink<W: Write + Send> {
    writer: W,
    format: LineFormat,
    min_log_level: LogLevel,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink writing JSON lines
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            format: LineFormat::Json,
            min_log_level: LogLevel::Info,
        }
    }

    /// Set the line format
    #[must_use]
    pub fn with_format(mut self, format: LineFormat) -> Self {
        self.format = format;
        self
    }

    /// Drop log messages below this level
    #[must_use]
    pub fn with_min_log_level(mut self, level: LogLevel) -> Self {
        self.min_log_level = level;
        self
    }

    /// Get the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn render(&self, message: &Message) -> Result<String> {
        match self.format {
            LineFormat::Json => Ok(serde_json::to_string(message)?),
            LineFormat::Pretty => Ok(match message {
                Message::Record(r) => format!("[RECORD] {} {}", r.stream, r.data),
                Message::State { stream, data } => format!("[STATE] {stream} {data}"),
                Message::Error { stream, message } => format!("[ERROR] {stream}: {message}"),
                Message::StreamStatus { stream, status } => format!("[STATUS] {stream} {status}"),
                Message::Log { level, message } => format!("[{level:?}] {message}"),
            }),
        }
    }
}

#[async_trait]
impl<W: Write + Send> MessageSink for WriterSink<W> {
    async fn accept(&mut self, message: Message) -> Result<()> {
        if let Message::Log { level, .. } = &message {
            if tracing::Level::from(*level) > tracing::Level::from(self.min_log_level) {
                return Ok(());
            }
        }
        let line = self.render(&message)?;
        writeln!(self.writer, "{line}").map_err(|e| Error::sink(format!("write failed: {e}")))
    }

    async fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::sink(format!("flush failed: {e}")))
    }
}

// ============================================================================
// State Sink
// ============================================================================

/// Records every checkpoint into a `StateManager` before forwarding it
#[derive(Debug)]
pub struct StateSink<S> {
    inner: S,
    state: StateManager,
}

impl<S: MessageSink> StateSink<S> {
    /// Wrap a sink
    pub fn new(inner: S, state: StateManager) -> Self {
        Self { inner, state }
    }

    /// The state manager checkpoints are recorded into
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    /// Get the wrapped sink
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait]
impl<S: MessageSink> MessageSink for StateSink<S> {
    async fn accept(&mut self, message: Message) -> Result<()> {
        if let Message::State { stream, data } = &message {
            self.state.set_checkpoint(stream, data.clone()).await?;
        }
        self.inner.accept(message).await
    }

    async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        self.state.checkpoint().await
    }
}
