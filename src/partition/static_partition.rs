//! In-memory partition implementation
//!
//! Serves records held in memory, optionally failing part way through and
//! pausing between records to simulate a slow upstream.

use super::types::{Partition, Record, RecordStream};
use crate::error::Error;
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;

/// Partition backed by records held in memory
#[derive(Debug, Clone)]
pub struct StaticPartition {
    /// Owning stream
    stream: String,
    /// Partition identifier
    id: String,
    /// Slice descriptor
    slice: Option<Value>,
    /// Records served by `read`
    records: Vec<Value>,
    /// Fail after yielding this many records
    fail_after: Option<usize>,
    /// Pause before each record
    record_delay: Option<Duration>,
}

impl StaticPartition {
    /// Create a new partition
    pub fn new(stream: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            id: id.into(),
            slice: None,
            records: Vec::new(),
            fail_after: None,
            record_delay: None,
        }
    }

    /// Set the slice descriptor
    #[must_use]
    pub fn with_slice(mut self, slice: Value) -> Self {
        self.slice = Some(slice);
        self
    }

    /// Set the records to serve
    #[must_use]
    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.records = records;
        self
    }

    /// Fail after yielding `count` records
    #[must_use]
    pub fn with_fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Pause before each record
    #[must_use]
    pub fn with_record_delay(mut self, delay: Duration) -> Self {
        self.record_delay = Some(delay);
        self
    }

    /// Number of records this partition yields before ending or failing
    pub fn yielded_count(&self) -> usize {
        self.fail_after
            .map_or(self.records.len(), |n| n.min(self.records.len()))
    }
}

impl Partition for StaticPartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn to_slice(&self) -> Option<Value> {
        self.slice.clone()
    }

    fn read(&self) -> RecordStream {
        let mut items: Vec<_> = self
            .records
            .iter()
            .take(self.yielded_count())
            .map(|data| Ok(Record::new(self, data.clone())))
            .collect();

        if let Some(n) = self.fail_after {
            items.push(Err(Error::partition(
                self.stream.clone(),
                format!("partition '{}' failed after {n} records", self.id),
            )));
        }

        let delay = self.record_delay;
        futures::stream::iter(items)
            .then(move |item| async move {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                item
            })
            .boxed()
    }
}
