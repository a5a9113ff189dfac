//! In-memory stream implementation

use super::types::{PartitionStream, Stream};
use crate::cursor::{compare_cursor_values, Cursor, FinalStateCursor};
use crate::error::{Error, Result};
use crate::partition::{extract_path, Partition, SliceBounds, StaticPartition};
use futures::StreamExt;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Stream whose partitions are held in memory
#[derive(Clone)]
pub struct StaticStream {
    name: String,
    partitions: Vec<StaticPartition>,
    cursor: Arc<dyn Cursor>,
    /// Fail generation after this many partitions
    fail_generation_after: Option<usize>,
    /// Pause before each partition is generated
    partition_delay: Option<Duration>,
}

impl StaticStream {
    /// Create an empty stream with a final state cursor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partitions: Vec::new(),
            cursor: Arc::new(FinalStateCursor::new()),
            fail_generation_after: None,
            partition_delay: None,
        }
    }

    /// Split `records` into one partition per slice, by `cursor_field`
    ///
    /// A record lands in the slice whose `[start, end)` range contains its
    /// cursor value; records outside every slice are dropped.
    pub fn sliced(
        name: impl Into<String>,
        cursor_field: &str,
        records: &[Value],
        slices: &[SliceBounds],
    ) -> Result<Self> {
        let name = name.into();
        let mut partitions = Vec::with_capacity(slices.len());

        for (idx, bounds) in slices.iter().enumerate() {
            let mut in_slice = Vec::new();
            for record in records {
                let Some(value) = extract_path(record, cursor_field) else {
                    continue;
                };
                let after_start = compare_cursor_values(value, &bounds.start).ok_or_else(|| {
                    Error::stream(&name, format!("Cannot compare {value} with slice start"))
                })? != Ordering::Less;
                let before_end = compare_cursor_values(value, &bounds.end).ok_or_else(|| {
                    Error::stream(&name, format!("Cannot compare {value} with slice end"))
                })? == Ordering::Less;
                if after_start && before_end {
                    in_slice.push(record.clone());
                }
            }

            partitions.push(
                StaticPartition::new(&name, format!("{idx}_{}", slice_label(&bounds.start)))
                    .with_slice(bounds.to_slice())
                    .with_records(in_slice),
            );
        }

        Ok(Self::new(name).with_partitions(partitions))
    }

    /// Add a partition
    #[must_use]
    pub fn with_partition(mut self, partition: StaticPartition) -> Self {
        self.partitions.push(partition);
        self
    }

    /// Replace the partitions
    #[must_use]
    pub fn with_partitions(mut self, partitions: Vec<StaticPartition>) -> Self {
        self.partitions = partitions;
        self
    }

    /// Set the cursor
    #[must_use]
    pub fn with_cursor(mut self, cursor: Arc<dyn Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Fail generation after `count` partitions
    #[must_use]
    pub fn with_fail_generation_after(mut self, count: usize) -> Self {
        self.fail_generation_after = Some(count);
        self
    }

    /// Pause before each partition is generated
    #[must_use]
    pub fn with_partition_delay(mut self, delay: Duration) -> Self {
        self.partition_delay = Some(delay);
        self
    }

    /// The configured partitions
    pub fn partitions(&self) -> &[StaticPartition] {
        &self.partitions
    }
}

impl Stream for StaticStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_partitions(&self) -> PartitionStream {
        let count = self
            .fail_generation_after
            .map_or(self.partitions.len(), |n| n.min(self.partitions.len()));

        let mut items: Vec<Result<Box<dyn Partition>>> = self
            .partitions
            .iter()
            .take(count)
            .map(|p| Ok(Box::new(p.clone()) as Box<dyn Partition>))
            .collect();

        if let Some(n) = self.fail_generation_after {
            items.push(Err(Error::stream(
                self.name.clone(),
                format!("partition generation failed after {n} partitions"),
            )));
        }

        let delay = self.partition_delay;
        futures::stream::iter(items)
            .then(move |item| async move {
                if let Some(d) = delay {
                    tokio::time::sleep(d).await;
                }
                item
            })
            .boxed()
    }

    fn cursor(&self) -> Arc<dyn Cursor> {
        Arc::clone(&self.cursor)
    }
}

impl fmt::Debug for StaticStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticStream")
            .field("name", &self.name)
            .field("partitions", &self.partitions.len())
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

fn slice_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
