//! Execution engine module
//!
//! Concurrent read loop and stream orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `ConcurrentSource` - Reads many streams partition by partition on a
//!   bounded worker pool
//! - `SyncConfig` - Configuration for a read
//! - Message types for output (Record, State, Error, StreamStatus, Log)
//!
//! Generators and readers run on the pool and talk to the coordinator only
//! through the work queue. The coordinator runs on the caller's task and is
//! the only one touching the sink, so output order is queue arrival order.

mod enqueuer;
mod processor;
mod reader;
mod types;

pub use types::{Message, ReadSummary, SyncConfig, SyncStats};

use crate::error::Result;
use crate::pool::ThreadPoolManager;
use crate::queue::{QueueItem, WorkQueue};
use crate::sink::MessageSink;
use crate::stream::Stream;
use processor::ConcurrentReadProcessor;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Reads a set of streams concurrently
#[derive(Debug, Clone, Default)]
pub struct ConcurrentSource {
    /// Read configuration
    config: SyncConfig,
}

impl ConcurrentSource {
    /// Create a source with the given configuration
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Read every stream and forward its output to `sink`
    ///
    /// Stream-level failures are reported in the returned summary. A fatal
    /// error (worker panic, queue timeout, sink failure) aborts the remaining
    /// work and is returned as `Err`.
    pub async fn read(
        &self,
        streams: Vec<Arc<dyn Stream>>,
        sink: &mut dyn MessageSink,
    ) -> Result<ReadSummary> {
        self.config.validate()?;
        let start = Instant::now();

        let mut queue = WorkQueue::new();
        let mut pool = ThreadPoolManager::new(
            self.config.num_workers,
            self.config.max_concurrent_tasks,
        );
        let mut processor = ConcurrentReadProcessor::new(
            streams,
            &self.config,
            queue.sender(),
            pool.capacity_gauge(),
        )?;

        info!(
            workers = self.config.num_workers,
            generators = self.config.max_concurrent_generators,
            "Starting concurrent read"
        );

        if let Err(e) = self
            .run(&mut processor, &mut queue, &mut pool, sink)
            .await
        {
            error!(error = %e, "Concurrent read failed");
            pool.shutdown().await;
            return Err(e);
        }

        if let Err(e) = pool.wait_until_done().await {
            pool.shutdown().await;
            return Err(e);
        }
        sink.flush().await?;

        #[allow(clippy::cast_possible_truncation)]
        let summary = processor.into_summary(pool.stats(), start.elapsed().as_millis() as u64);
        info!(
            records = summary.total.records,
            failed = summary.failed_streams.len(),
            duration_ms = summary.total.duration_ms,
            "Concurrent read finished"
        );
        Ok(summary)
    }

    async fn run(
        &self,
        processor: &mut ConcurrentReadProcessor,
        queue: &mut WorkQueue,
        pool: &mut ThreadPoolManager,
        sink: &mut dyn MessageSink,
    ) -> Result<()> {
        let timeout = self.config.queue_timeout();

        for message in processor.start_next_streams(pool)? {
            sink.accept(message).await?;
        }

        while !processor.is_done() {
            let item = queue.get_timeout(timeout).await?;
            let messages = match item {
                QueueItem::Partition(partition) => {
                    processor.on_partition(partition, pool)?;
                    Vec::new()
                }
                QueueItem::Record(record) => processor.on_record(record)?,
                QueueItem::PartitionComplete(sentinel) => {
                    processor.on_partition_complete(sentinel)?
                }
                QueueItem::GenerationComplete(sentinel) => {
                    processor.on_generation_complete(sentinel, pool)?
                }
                QueueItem::StreamError(err) => processor.on_stream_error(err)?,
            };

            for message in messages {
                sink.accept(message).await?;
            }
            pool.check_for_errors()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
