//! Partition types and traits
//!
//! Defines the core partition abstractions.

use crate::error::Result;
use futures::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Lazy, finite sequence of records produced by reading one partition
pub type RecordStream = BoxStream<'static, Result<Record>>;

/// A single record read from a partition
///
/// Carries the originating stream and partition so the stream's cursor can
/// attribute the record to the right unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Stream name
    pub stream: String,
    /// Id of the partition that produced this record
    pub partition_id: String,
    /// Slice descriptor of the originating partition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slice: Option<Value>,
    /// Record payload
    pub data: Value,
}

impl Record {
    /// Create a record attributed to a partition
    pub fn new(partition: &dyn Partition, data: Value) -> Self {
        Self {
            stream: partition.stream_name().to_string(),
            partition_id: partition.id().to_string(),
            slice: partition.to_slice(),
            data,
        }
    }

    /// Get a field using dot notation (e.g. "data.updated_at")
    pub fn get(&self, path: &str) -> Option<&Value> {
        extract_path(&self.data, path)
    }
}

/// Walk a dot-separated path into a JSON value
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.').filter(|p| !p.is_empty()) {
        current = match current {
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => current.get(part)?,
        };
    }
    Some(current)
}

/// An independently readable unit of work derived from a stream
///
/// A partition is handed to exactly one reader, so implementations need no
/// interior synchronisation beyond what `read` itself requires.
pub trait Partition: Send + Sync + fmt::Debug {
    /// Name of the stream that generated this partition
    fn stream_name(&self) -> &str;

    /// Identifier, unique within the stream
    fn id(&self) -> &str;

    /// Serialisable descriptor of the unit of work (date range, page, parent id)
    fn to_slice(&self) -> Option<Value>;

    /// Read the partition's records
    ///
    /// The returned sequence is not restartable.
    fn read(&self) -> RecordStream;
}
