//! Partition generation worker

use crate::error::{panic_message, Error, Result};
use crate::pool::CapacityGauge;
use crate::queue::{QueueItem, QueueSender};
use crate::stream::Stream;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Pushes a stream's partitions onto the work queue, throttled by pool capacity
#[derive(Debug, Clone)]
pub(crate) struct PartitionEnqueuer {
    queue: QueueSender,
    gauge: CapacityGauge,
    poll_interval: Duration,
}

impl PartitionEnqueuer {
    pub(crate) fn new(queue: QueueSender, gauge: CapacityGauge, poll_interval: Duration) -> Self {
        Self {
            queue,
            gauge,
            poll_interval,
        }
    }

    /// Generate every partition of `stream`
    ///
    /// Always ends with exactly one `GenerationComplete` for the stream,
    /// preceded by a `StreamError` when generation failed or panicked.
    pub(crate) async fn generate_partitions(self, stream: Arc<dyn Stream>) {
        let name = stream.name().to_string();
        let outcome = AssertUnwindSafe(self.enqueue_all(&*stream))
            .catch_unwind()
            .await;

        let error = match outcome {
            Ok(Ok(count)) => {
                debug!(stream = %name, partitions = count, "Partition generation finished");
                None
            }
            Ok(Err(Error::QueueClosed)) => {
                debug!(stream = %name, "Work queue closed during partition generation");
                return;
            }
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(Error::worker_panic(
                format!("generate:{name}"),
                panic_message(&*payload),
            )),
        };

        if let Some(e) = error {
            warn!(stream = %name, error = %e, "Partition generation failed");
            if self
                .queue
                .put(QueueItem::stream_error(&name, Arc::new(e)))
                .is_err()
            {
                return;
            }
        }

        if self.queue.put(QueueItem::generation_complete(&name)).is_err() {
            debug!(stream = %name, "Work queue closed before generation sentinel");
        }
    }

    async fn enqueue_all(&self, stream: &dyn Stream) -> Result<usize> {
        let mut partitions = stream.generate_partitions();
        let mut count = 0;

        while let Some(partition) = partitions.next().await {
            let partition = partition?;
            self.gauge.reserve_slot(self.poll_interval).await;
            if let Err(e) = self.queue.put(QueueItem::Partition(partition)) {
                self.gauge.release_slot();
                return Err(e);
            }
            count += 1;
        }

        Ok(count)
    }
}
