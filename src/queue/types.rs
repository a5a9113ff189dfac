//! Work queue item types
//!
//! Everything workers hand to the coordinator travels as a `QueueItem`.

use crate::error::SharedError;
use crate::partition::{Partition, Record};

/// Signals that a partition has been read, successfully or not
///
/// Exactly one is produced for every partition handed to a reader.
#[derive(Debug)]
pub struct PartitionCompleteSentinel {
    /// The partition, handed back by its reader
    pub partition: Box<dyn Partition>,
    /// Whether every record was read and the partition was closed
    pub is_successful: bool,
}

/// Signals that a stream has no more partitions to generate
///
/// Exactly one is produced for every stream whose generation was started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationCompleteSentinel {
    /// Stream name
    pub stream: String,
}

/// An error caught inside a worker, attributed to a stream
#[derive(Debug, Clone)]
pub struct StreamThreadError {
    /// Stream name
    pub stream: String,
    /// The caught error
    pub error: SharedError,
}

/// A message on the work queue
#[derive(Debug)]
pub enum QueueItem {
    /// A partition ready to be read
    Partition(Box<dyn Partition>),
    /// A record read from a partition
    Record(Record),
    /// A partition finished
    PartitionComplete(PartitionCompleteSentinel),
    /// A stream finished generating partitions
    GenerationComplete(GenerationCompleteSentinel),
    /// A worker caught an error
    StreamError(StreamThreadError),
}

impl QueueItem {
    /// Create a partition completion item
    pub fn partition_complete(partition: Box<dyn Partition>, is_successful: bool) -> Self {
        Self::PartitionComplete(PartitionCompleteSentinel {
            partition,
            is_successful,
        })
    }

    /// Create a generation completion item
    pub fn generation_complete(stream: impl Into<String>) -> Self {
        Self::GenerationComplete(GenerationCompleteSentinel {
            stream: stream.into(),
        })
    }

    /// Create a stream error item
    pub fn stream_error(stream: impl Into<String>, error: SharedError) -> Self {
        Self::StreamError(StreamThreadError {
            stream: stream.into(),
            error,
        })
    }

    /// Name of the stream this item belongs to
    pub fn stream_name(&self) -> &str {
        match self {
            Self::Partition(p) => p.stream_name(),
            Self::Record(r) => &r.stream,
            Self::PartitionComplete(s) => s.partition.stream_name(),
            Self::GenerationComplete(s) => &s.stream,
            Self::StreamError(e) => &e.stream,
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Partition(_) => "partition",
            Self::Record(_) => "record",
            Self::PartitionComplete(_) => "partition_complete",
            Self::GenerationComplete(_) => "generation_complete",
            Self::StreamError(_) => "stream_error",
        }
    }
}
