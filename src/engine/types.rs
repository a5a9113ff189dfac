//! Engine types
//!
//! Message types, configuration and statistics for concurrent reads.

use crate::error::{Error, Result};
use crate::partition::Record;
use crate::pool::PoolStats;
use crate::types::{LogLevel, StreamStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// A message forwarded to the sink during a read
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// A record read from a partition
    Record(Record),
    /// Checkpoint for a stream
    State {
        /// Stream name
        stream: String,
        /// Opaque checkpoint produced by the stream's cursor
        data: Value,
    },
    /// Stream-level error caught in a worker
    Error {
        /// Stream name
        stream: String,
        /// Error message
        message: String,
    },
    /// Stream lifecycle status
    StreamStatus {
        /// Stream name
        stream: String,
        /// New status
        status: StreamStatus,
    },
    /// Log message
    Log {
        /// Log level
        level: LogLevel,
        /// Log message
        message: String,
    },
}

impl Message {
    /// Create a state message
    pub fn state(stream: impl Into<String>, data: Value) -> Self {
        Self::State {
            stream: stream.into(),
            data,
        }
    }

    /// Create a stream error message
    pub fn stream_error(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a stream status message
    pub fn status(stream: impl Into<String>, status: StreamStatus) -> Self {
        Self::StreamStatus {
            stream: stream.into(),
            status,
        }
    }

    /// Create a log message
    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        Self::Log {
            level,
            message: message.into(),
        }
    }

    /// Create an info log
    pub fn info(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Info, message)
    }

    /// Create a debug log
    pub fn debug(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Debug, message)
    }

    /// Create a warning log
    pub fn warn(message: impl Into<String>) -> Self {
        Self::log(LogLevel::Warn, message)
    }

    /// Check if this is a record message
    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Check if this is a state message
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is an error message
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check if this is a log message
    pub fn is_log(&self) -> bool {
        matches!(self, Self::Log { .. })
    }

    /// Stream this message belongs to, if any
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Record(r) => Some(&r.stream),
            Self::State { stream, .. }
            | Self::Error { stream, .. }
            | Self::StreamStatus { stream, .. } => Some(stream),
            Self::Log { .. } => None,
        }
    }
}

// ============================================================================
// SyncConfig
// ============================================================================

/// Configuration for a concurrent read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Size of the worker pool shared by generators and readers
    pub num_workers: usize,
    /// Streams generating partitions at the same time; must be below `num_workers`
    pub max_concurrent_generators: usize,
    /// In-flight task threshold past which generators are throttled
    pub max_concurrent_tasks: usize,
    /// Fallback re-check interval while throttled
    pub capacity_poll_interval_ms: u64,
    /// Fail the read if no worker message arrives for this long
    pub queue_timeout_secs: u64,
    /// Emit a checkpoint after every successful partition
    pub checkpoint_per_partition: bool,
    /// Emit stream status messages
    pub emit_stream_status: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            max_concurrent_generators: 1,
            max_concurrent_tasks: 10_000,
            capacity_poll_interval_ms: 100,
            queue_timeout_secs: 900,
            checkpoint_per_partition: true,
            emit_stream_status: true,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count
    #[must_use]
    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Set how many streams generate partitions at once
    #[must_use]
    pub fn with_max_concurrent_generators(mut self, count: usize) -> Self {
        self.max_concurrent_generators = count;
        self
    }

    /// Set the in-flight task threshold
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, count: usize) -> Self {
        self.max_concurrent_tasks = count;
        self
    }

    /// Set the capacity re-check interval
    #[must_use]
    pub fn with_capacity_poll_interval(mut self, interval: Duration) -> Self {
        self.capacity_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the queue timeout, rounded up to whole seconds
    #[must_use]
    pub fn with_queue_timeout(mut self, timeout: Duration) -> Self {
        let secs = timeout.as_secs();
        self.queue_timeout_secs = if timeout.subsec_nanos() > 0 { secs + 1 } else { secs };
        self
    }

    /// Emit a checkpoint after each partition
    #[must_use]
    pub fn with_checkpoint_per_partition(mut self, emit: bool) -> Self {
        self.checkpoint_per_partition = emit;
        self
    }

    /// Emit stream status messages
    #[must_use]
    pub fn with_stream_status(mut self, emit: bool) -> Self {
        self.emit_stream_status = emit;
        self
    }

    /// Capacity re-check interval
    pub fn capacity_poll_interval(&self) -> Duration {
        Duration::from_millis(self.capacity_poll_interval_ms)
    }

    /// Queue timeout
    pub fn queue_timeout(&self) -> Duration {
        Duration::from_secs(self.queue_timeout_secs)
    }

    /// Check the configuration can make progress
    ///
    /// Generators hold a worker while they wait for capacity, so at least
    /// one worker must always be left for readers.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(Error::invalid_value("num_workers", "must be at least 1"));
        }
        if self.max_concurrent_generators == 0 {
            return Err(Error::invalid_value(
                "max_concurrent_generators",
                "must be at least 1",
            ));
        }
        if self.max_concurrent_generators >= self.num_workers {
            return Err(Error::invalid_value(
                "max_concurrent_generators",
                format!(
                    "too many partition generators ({}) for {} workers",
                    self.max_concurrent_generators, self.num_workers
                ),
            ));
        }
        // Running generators count as in-flight tasks themselves
        if self.max_concurrent_tasks <= self.max_concurrent_generators {
            return Err(Error::invalid_value(
                "max_concurrent_tasks",
                format!(
                    "must exceed max_concurrent_generators ({})",
                    self.max_concurrent_generators
                ),
            ));
        }
        if self.capacity_poll_interval_ms == 0 {
            return Err(Error::invalid_value(
                "capacity_poll_interval_ms",
                "must be at least 1",
            ));
        }
        if self.queue_timeout_secs == 0 {
            return Err(Error::invalid_value(
                "queue_timeout_secs",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Counters for a read, overall or per stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Records forwarded to the sink
    pub records: usize,
    /// Partitions handed to readers
    pub partitions_submitted: usize,
    /// Successful partition completion sentinels
    pub partitions_succeeded: usize,
    /// Failed partition completion sentinels
    pub partitions_failed: usize,
    /// Partitions dropped because their stream had already failed
    pub partitions_skipped: usize,
    /// Generation completion sentinels
    pub generations_completed: usize,
    /// Checkpoints emitted
    pub checkpoints: usize,
    /// Errors forwarded
    pub errors: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition completion sentinels of either outcome
    pub fn partitions_completed(&self) -> usize {
        self.partitions_succeeded + self.partitions_failed
    }

    /// Add another set of counters into this one
    pub fn absorb(&mut self, other: &SyncStats) {
        self.records += other.records;
        self.partitions_submitted += other.partitions_submitted;
        self.partitions_succeeded += other.partitions_succeeded;
        self.partitions_failed += other.partitions_failed;
        self.partitions_skipped += other.partitions_skipped;
        self.generations_completed += other.generations_completed;
        self.checkpoints += other.checkpoints;
        self.errors += other.errors;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}

/// Outcome of a read whose main loop completed
///
/// A read that returns a summary may still contain failed streams; a read
/// that failed as a whole returns an `Err` instead.
#[derive(Debug, Clone, Default)]
pub struct ReadSummary {
    /// Totals over all streams
    pub total: SyncStats,
    /// Counters per stream
    pub streams: BTreeMap<String, SyncStats>,
    /// Streams that ended with at least one error, in the order they failed
    pub failed_streams: Vec<String>,
    /// Worker pool counters at the end of the read
    pub pool: PoolStats,
}

impl ReadSummary {
    /// Whether every stream completed without errors
    pub fn is_success(&self) -> bool {
        self.failed_streams.is_empty()
    }

    /// Counters for one stream
    pub fn stream(&self, name: &str) -> Option<&SyncStats> {
        self.streams.get(name)
    }

    /// Turn stream failures into an error
    pub fn into_result(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::StreamsFailed {
                streams: self.failed_streams,
            })
        }
    }
}
