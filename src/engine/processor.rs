//! Coordinator bookkeeping
//!
//! Tracks every stream of a read through `Pending -> Generating -> Draining
//! -> Done` and turns queue items into sink messages.

use super::enqueuer::PartitionEnqueuer;
use super::reader::PartitionReader;
use super::types::{Message, ReadSummary, SyncConfig, SyncStats};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::partition::{Partition, Record};
use crate::pool::{CapacityGauge, PoolStats, ThreadPoolManager};
use crate::queue::{
    GenerationCompleteSentinel, PartitionCompleteSentinel, QueueSender, StreamThreadError,
};
use crate::stream::Stream;
use crate::types::StreamStatus;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamPhase {
    Pending,
    Generating,
    Draining,
    Done,
}

struct StreamEntry {
    stream: Arc<dyn Stream>,
    cursor: Arc<dyn Cursor>,
    phase: StreamPhase,
    outstanding: usize,
    failed: bool,
    seen_record: bool,
    stats: SyncStats,
}

impl StreamEntry {
    fn name(&self) -> &str {
        self.stream.name()
    }
}

pub(crate) struct ConcurrentReadProcessor {
    entries: Vec<StreamEntry>,
    index: HashMap<String, usize>,
    pending: VecDeque<usize>,
    generating: usize,
    max_generators: usize,
    checkpoint_per_partition: bool,
    emit_stream_status: bool,
    failed_streams: Vec<String>,
    enqueuer: PartitionEnqueuer,
    reader: PartitionReader,
}

impl ConcurrentReadProcessor {
    /// Set up bookkeeping; stream names must be unique
    pub(crate) fn new(
        streams: Vec<Arc<dyn Stream>>,
        config: &SyncConfig,
        queue: QueueSender,
        gauge: CapacityGauge,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(streams.len());
        let mut index = HashMap::with_capacity(streams.len());

        for stream in streams {
            let name = stream.name().to_string();
            if index.insert(name.clone(), entries.len()).is_some() {
                return Err(Error::DuplicateStream { stream: name });
            }
            let cursor = stream.cursor();
            entries.push(StreamEntry {
                stream,
                cursor,
                phase: StreamPhase::Pending,
                outstanding: 0,
                failed: false,
                seen_record: false,
                stats: SyncStats::new(),
            });
        }

        Ok(Self {
            pending: (0..entries.len()).collect(),
            entries,
            index,
            generating: 0,
            max_generators: config.max_concurrent_generators,
            checkpoint_per_partition: config.checkpoint_per_partition,
            emit_stream_status: config.emit_stream_status,
            failed_streams: Vec::new(),
            enqueuer: PartitionEnqueuer::new(
                queue.clone(),
                gauge,
                config.capacity_poll_interval(),
            ),
            reader: PartitionReader::new(queue),
        })
    }

    /// Whether every stream reached `Done`
    pub(crate) fn is_done(&self) -> bool {
        self.entries.iter().all(|e| e.phase == StreamPhase::Done)
    }

    /// Start generators while slots are free
    pub(crate) fn start_next_streams(
        &mut self,
        pool: &mut ThreadPoolManager,
    ) -> Result<Vec<Message>> {
        let mut messages = Vec::new();

        while self.generating < self.max_generators {
            let Some(idx) = self.pending.pop_front() else {
                break;
            };
            let entry = &mut self.entries[idx];
            entry.phase = StreamPhase::Generating;
            self.generating += 1;

            let name = entry.name().to_string();
            info!(stream = %name, "Starting stream");
            messages.push(Message::info(format!("Starting stream: {name}")));
            if self.emit_stream_status {
                messages.push(Message::status(&name, StreamStatus::Started));
            }

            let enqueuer = self.enqueuer.clone();
            let stream = Arc::clone(&entry.stream);
            pool.submit(
                format!("generate:{name}"),
                enqueuer.generate_partitions(stream),
            )?;
        }

        Ok(messages)
    }

    /// Schedule a reader for a generated partition
    ///
    /// The partition arrives holding a capacity slot reserved by its
    /// generator; the slot is either consumed by the reader or released.
    pub(crate) fn on_partition(
        &mut self,
        partition: Box<dyn Partition>,
        pool: &mut ThreadPoolManager,
    ) -> Result<()> {
        let idx = match self.lookup(partition.stream_name()) {
            Ok(idx) => idx,
            Err(e) => {
                pool.release_reserved();
                return Err(e);
            }
        };
        let entry = &mut self.entries[idx];

        if entry.failed {
            debug!(
                stream = %entry.name(),
                partition = %partition.id(),
                "Skipping partition of failed stream"
            );
            entry.stats.partitions_skipped += 1;
            pool.release_reserved();
            return Ok(());
        }

        entry.outstanding += 1;
        entry.stats.partitions_submitted += 1;
        debug!(
            stream = %entry.name(),
            partition = %partition.id(),
            outstanding = entry.outstanding,
            "Submitting partition"
        );

        let name = format!("read:{}:{}", entry.name(), partition.id());
        let reader = self.reader.clone();
        let cursor = Arc::clone(&entry.cursor);
        pool.submit_reserved(name, reader.process_partition(partition, cursor))
    }

    /// Forward a record
    pub(crate) fn on_record(&mut self, record: Record) -> Result<Vec<Message>> {
        let idx = self.lookup(&record.stream)?;
        let entry = &mut self.entries[idx];
        let mut messages = Vec::with_capacity(2);

        if !entry.seen_record {
            entry.seen_record = true;
            if self.emit_stream_status {
                messages.push(Message::status(entry.name(), StreamStatus::Running));
            }
        }
        entry.stats.records += 1;
        messages.push(Message::Record(record));
        Ok(messages)
    }

    /// Account for a finished partition
    ///
    /// The partition's records are ahead of its sentinel on the queue, so they
    /// have reached the sink by now. Closing it here keeps every checkpoint
    /// behind the records already delivered.
    pub(crate) fn on_partition_complete(
        &mut self,
        sentinel: PartitionCompleteSentinel,
    ) -> Result<Vec<Message>> {
        let idx = self.lookup(sentinel.partition.stream_name())?;
        let mut messages = Vec::new();
        let mut is_successful = sentinel.is_successful;
        {
            let entry = &mut self.entries[idx];
            entry.outstanding = entry.outstanding.saturating_sub(1);

            if is_successful {
                if let Err(e) = entry.cursor.close_partition(&*sentinel.partition) {
                    error!(
                        stream = %entry.name(),
                        partition = %sentinel.partition.id(),
                        error = %e,
                        "Failed to close partition"
                    );
                    entry.stats.errors += 1;
                    messages.push(Message::stream_error(entry.name(), e.to_string()));
                    is_successful = false;
                }
            }

            if is_successful {
                entry.stats.partitions_succeeded += 1;
                if self.checkpoint_per_partition {
                    entry.stats.checkpoints += 1;
                    messages.push(Message::state(entry.name(), entry.cursor.state()));
                }
            } else {
                entry.stats.partitions_failed += 1;
            }
        }
        if !is_successful {
            self.mark_failed(idx);
        }

        messages.extend(self.maybe_finish(idx));
        Ok(messages)
    }

    /// Account for a stream that has no more partitions
    pub(crate) fn on_generation_complete(
        &mut self,
        sentinel: GenerationCompleteSentinel,
        pool: &mut ThreadPoolManager,
    ) -> Result<Vec<Message>> {
        let idx = self.lookup(&sentinel.stream)?;
        {
            let entry = &mut self.entries[idx];
            entry.stats.generations_completed += 1;
            if entry.phase == StreamPhase::Generating {
                entry.phase = StreamPhase::Draining;
                self.generating -= 1;
            }
            debug!(
                stream = %entry.name(),
                outstanding = entry.outstanding,
                "Partition generation complete"
            );
        }

        let mut messages = self.maybe_finish(idx);
        messages.extend(self.start_next_streams(pool)?);
        Ok(messages)
    }

    /// Forward an error caught in a worker and fail its stream
    pub(crate) fn on_stream_error(&mut self, err: StreamThreadError) -> Result<Vec<Message>> {
        let idx = self.lookup(&err.stream)?;
        error!(stream = %err.stream, error = %err.error, "Stream error");
        self.entries[idx].stats.errors += 1;
        self.mark_failed(idx);
        Ok(vec![Message::stream_error(err.stream, err.error.to_string())])
    }

    /// Build the summary of the read
    pub(crate) fn into_summary(self, pool: PoolStats, duration_ms: u64) -> ReadSummary {
        let mut total = SyncStats::new();
        let mut streams = BTreeMap::new();
        for entry in self.entries {
            total.absorb(&entry.stats);
            streams.insert(entry.stream.name().to_string(), entry.stats);
        }
        total.set_duration(duration_ms);

        ReadSummary {
            total,
            streams,
            failed_streams: self.failed_streams,
            pool,
        }
    }

    fn lookup(&self, stream: &str) -> Result<usize> {
        self.index
            .get(stream)
            .copied()
            .ok_or_else(|| Error::StreamNotFound {
                stream: stream.to_string(),
            })
    }

    fn mark_failed(&mut self, idx: usize) {
        let entry = &mut self.entries[idx];
        if !entry.failed {
            entry.failed = true;
            self.failed_streams.push(entry.name().to_string());
        }
    }

    /// Emit the final checkpoint and status once the stream is drained
    fn maybe_finish(&mut self, idx: usize) -> Vec<Message> {
        let entry = &mut self.entries[idx];
        if entry.phase != StreamPhase::Draining || entry.outstanding > 0 {
            return Vec::new();
        }
        entry.phase = StreamPhase::Done;
        entry.stats.checkpoints += 1;

        let name = entry.name().to_string();
        let mut messages = vec![Message::state(&name, entry.cursor.state())];

        let status = if entry.failed {
            info!(stream = %name, "Stream finished with errors");
            messages.push(Message::warn(format!("Stream {name} finished with errors")));
            StreamStatus::Incomplete
        } else {
            info!(stream = %name, records = entry.stats.records, "Stream complete");
            messages.push(Message::info(format!(
                "Finished stream {name}: {} records",
                entry.stats.records
            )));
            StreamStatus::Complete
        };
        if self.emit_stream_status {
            messages.push(Message::status(&name, status));
        }
        messages
    }
}
