//! Partition read worker

use crate::cursor::Cursor;
use crate::error::{panic_message, Error, Result};
use crate::partition::Partition;
use crate::queue::{QueueItem, QueueSender};
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads one partition and publishes its records
#[derive(Debug, Clone)]
pub(crate) struct PartitionReader {
    queue: QueueSender,
}

impl PartitionReader {
    pub(crate) fn new(queue: QueueSender) -> Self {
        Self { queue }
    }

    /// Read every record of `partition`
    ///
    /// Each record is observed on the cursor before it is published. The
    /// sentinel follows the last record on the queue; the coordinator closes
    /// the partition on the cursor when it handles a successful sentinel.
    /// Always ends with exactly one `PartitionComplete` for the partition.
    pub(crate) async fn process_partition(
        self,
        partition: Box<dyn Partition>,
        cursor: Arc<dyn Cursor>,
    ) {
        let outcome = AssertUnwindSafe(self.read_all(&*partition, &*cursor))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(count)) => {
                debug!(
                    stream = %partition.stream_name(),
                    partition = %partition.id(),
                    records = count,
                    "Partition read"
                );
                None
            }
            Ok(Err(Error::QueueClosed)) => {
                debug!(partition = %partition.id(), "Work queue closed during partition read");
                return;
            }
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(Error::worker_panic(
                format!("read:{}", partition.id()),
                panic_message(&*payload),
            )),
        };

        let is_successful = error.is_none();
        if let Some(e) = error {
            warn!(
                stream = %partition.stream_name(),
                partition = %partition.id(),
                error = %e,
                "Partition read failed"
            );
            let item = QueueItem::stream_error(partition.stream_name(), Arc::new(e));
            if self.queue.put(item).is_err() {
                return;
            }
        }

        if self
            .queue
            .put(QueueItem::partition_complete(partition, is_successful))
            .is_err()
        {
            debug!("Work queue closed before partition sentinel");
        }
    }

    async fn read_all(&self, partition: &dyn Partition, cursor: &dyn Cursor) -> Result<usize> {
        let mut records = partition.read();
        let mut count = 0;

        while let Some(record) = records.next().await {
            let record = record?;
            cursor.observe(&record)?;
            self.queue.put(QueueItem::Record(record))?;
            count += 1;
        }

        Ok(count)
    }
}
