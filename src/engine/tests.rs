//! Tests for the concurrent read engine

use super::*;
use crate::cursor::{compare_cursor_values, ConcurrentCursor, Cursor, FinalStateCursor};
use crate::error::Error;
use crate::partition::{Partition, Record, RecordStream, SliceBounds, StaticPartition};
use crate::sink::CollectingSink;
use crate::stream::{PartitionStream, StaticStream};
use crate::types::StreamStatus;
use async_trait::async_trait;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;
use test_case::test_case;

// ============================================================================
// Helpers
// ============================================================================

fn records(stream: &str, n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({"stream": stream, "n": i})).collect()
}

fn static_stream(name: &str, partitions: usize, per_partition: usize) -> StaticStream {
    let parts = (0..partitions)
        .map(|i| {
            StaticPartition::new(name, format!("p{i}")).with_records(records(name, per_partition))
        })
        .collect();
    StaticStream::new(name).with_partitions(parts)
}

fn numeric_slices(count: i64, width: i64) -> Vec<SliceBounds> {
    (0..count)
        .map(|i| SliceBounds::new(json!(i * width), json!((i + 1) * width)))
        .collect()
}

fn config() -> SyncConfig {
    SyncConfig::new()
        .with_workers(4)
        .with_capacity_poll_interval(Duration::from_millis(5))
        .with_queue_timeout(Duration::from_secs(10))
}

async fn read(
    config: SyncConfig,
    streams: Vec<Arc<dyn Stream>>,
) -> (Result<ReadSummary>, CollectingSink) {
    let mut sink = CollectingSink::new();
    let result = ConcurrentSource::new(config).read(streams, &mut sink).await;
    (result, sink)
}

fn cursor_position(checkpoint: &Value) -> &Value {
    &checkpoint["cursor"]
}

/// Tracks how many partitions are being read at the same time
#[derive(Debug, Default)]
struct Probe {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Probe {
    fn enter(&self) {
        let now = self.active.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        self.peak.fetch_max(now, AtomicOrdering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

#[derive(Debug)]
struct ProbePartition {
    stream: String,
    id: String,
    count: usize,
    probe: Arc<Probe>,
}

impl Partition for ProbePartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn to_slice(&self) -> Option<Value> {
        None
    }

    fn read(&self) -> RecordStream {
        let items: Vec<Record> = (0..self.count)
            .map(|i| Record::new(self, json!({"partition": self.id, "n": i})))
            .collect();
        let probe = Arc::clone(&self.probe);

        futures::stream::unfold((0usize, items, probe), |(idx, items, probe)| async move {
            if idx == 0 {
                probe.enter();
            }
            if idx >= items.len() {
                probe.exit();
                return None;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            let record = items[idx].clone();
            Some((Ok(record), (idx + 1, items, probe)))
        })
        .boxed()
    }
}

#[derive(Debug)]
struct ProbeStream {
    name: String,
    partitions: usize,
    per_partition: usize,
    probe: Arc<Probe>,
    cursor: Arc<dyn Cursor>,
}

impl ProbeStream {
    fn new(name: &str, partitions: usize, per_partition: usize, probe: Arc<Probe>) -> Self {
        Self {
            name: name.to_string(),
            partitions,
            per_partition,
            probe,
            cursor: Arc::new(FinalStateCursor::new()),
        }
    }
}

impl Stream for ProbeStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_partitions(&self) -> PartitionStream {
        let parts: Vec<Result<Box<dyn Partition>>> = (0..self.partitions)
            .map(|i| {
                Ok(Box::new(ProbePartition {
                    stream: self.name.clone(),
                    id: format!("p{i}"),
                    count: self.per_partition,
                    probe: Arc::clone(&self.probe),
                }) as Box<dyn Partition>)
            })
            .collect();
        futures::stream::iter(parts).boxed()
    }

    fn cursor(&self) -> Arc<dyn Cursor> {
        Arc::clone(&self.cursor)
    }
}

#[derive(Debug)]
struct PanickingPartition {
    stream: String,
}

impl Partition for PanickingPartition {
    fn stream_name(&self) -> &str {
        &self.stream
    }

    fn id(&self) -> &str {
        "boom"
    }

    fn to_slice(&self) -> Option<Value> {
        None
    }

    fn read(&self) -> RecordStream {
        panic!("partition exploded");
    }
}

#[derive(Debug)]
struct PanickingStream {
    name: String,
    panic_in_generation: bool,
    cursor: Arc<dyn Cursor>,
}

impl PanickingStream {
    fn new(name: &str, panic_in_generation: bool) -> Self {
        Self {
            name: name.to_string(),
            panic_in_generation,
            cursor: Arc::new(FinalStateCursor::new()),
        }
    }
}

impl Stream for PanickingStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_partitions(&self) -> PartitionStream {
        if self.panic_in_generation {
            panic!("generator exploded");
        }
        let partition: Box<dyn Partition> = Box::new(PanickingPartition {
            stream: self.name.clone(),
        });
        futures::stream::iter(vec![Ok(partition)]).boxed()
    }

    fn cursor(&self) -> Arc<dyn Cursor> {
        Arc::clone(&self.cursor)
    }
}

/// Stream whose generation never finishes
#[derive(Debug)]
struct StalledStream {
    cursor: Arc<dyn Cursor>,
}

impl Stream for StalledStream {
    fn name(&self) -> &str {
        "stalled"
    }

    fn generate_partitions(&self) -> PartitionStream {
        futures::stream::pending().boxed()
    }

    fn cursor(&self) -> Arc<dyn Cursor> {
        Arc::clone(&self.cursor)
    }
}

/// Sink that stalls on the first record it receives
#[derive(Debug, Default)]
struct SlowSink {
    inner: CollectingSink,
    stalled: bool,
}

#[async_trait]
impl MessageSink for SlowSink {
    async fn accept(&mut self, message: Message) -> Result<()> {
        if message.is_record() && !self.stalled {
            self.stalled = true;
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        self.inner.accept(message).await
    }
}

/// Sink that rejects records
#[derive(Debug, Default)]
struct RejectingSink {
    accepted: usize,
}

#[async_trait]
impl MessageSink for RejectingSink {
    async fn accept(&mut self, message: Message) -> Result<()> {
        if message.is_record() {
            return Err(Error::sink("destination unavailable"));
        }
        self.accepted += 1;
        Ok(())
    }
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults_are_valid() {
    let config = SyncConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.capacity_poll_interval(), Duration::from_millis(100));
    assert_eq!(config.queue_timeout(), Duration::from_secs(900));
}

#[test_case(0, 1, 10 ; "zero workers")]
#[test_case(2, 0, 10 ; "zero generators")]
#[test_case(2, 2, 10 ; "generators equal workers")]
#[test_case(2, 3, 10 ; "generators exceed workers")]
#[test_case(4, 2, 2 ; "task threshold not above generators")]
fn test_config_rejected(workers: usize, generators: usize, tasks: usize) {
    let config = SyncConfig::new()
        .with_workers(workers)
        .with_max_concurrent_generators(generators)
        .with_max_concurrent_tasks(tasks);
    assert!(matches!(
        config.validate(),
        Err(Error::InvalidConfigValue { .. })
    ));
}

#[test]
fn test_config_rejects_zero_poll_interval() {
    let config = SyncConfig::new().with_capacity_poll_interval(Duration::ZERO);
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("capacity_poll_interval_ms"));
}

#[test_case(Duration::from_millis(500), 1 ; "sub second")]
#[test_case(Duration::from_millis(1500), 2 ; "fractional")]
#[test_case(Duration::from_secs(3), 3 ; "whole seconds")]
fn test_queue_timeout_rounds_up(timeout: Duration, expected_secs: u64) {
    let config = SyncConfig::new().with_queue_timeout(timeout);
    assert_eq!(config.queue_timeout_secs, expected_secs);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_yaml_uses_defaults() {
    let config: SyncConfig =
        serde_yaml::from_str("num_workers: 8\nmax_concurrent_generators: 3\n").unwrap();
    assert_eq!(config.num_workers, 8);
    assert_eq!(config.max_concurrent_generators, 3);
    assert_eq!(config.max_concurrent_tasks, 10_000);
    assert!(config.checkpoint_per_partition);
}

#[tokio::test]
async fn test_invalid_config_fails_read() {
    let streams: Vec<Arc<dyn Stream>> = vec![Arc::new(static_stream("users", 1, 1))];
    let (result, sink) = read(config().with_workers(1), streams).await;

    assert!(matches!(result, Err(Error::InvalidConfigValue { .. })));
    assert!(sink.messages().is_empty());
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[tokio::test]
async fn test_all_partitions_succeed() {
    let cursor = Arc::new(ConcurrentCursor::new("users", "id", json!(0)));
    let slices = numeric_slices(3, 10);
    let parts = slices
        .iter()
        .enumerate()
        .map(|(i, bounds)| {
            StaticPartition::new("users", format!("p{i}"))
                .with_slice(bounds.to_slice())
                .with_records(records("users", 2))
        })
        .collect();
    let stream = StaticStream::new("users")
        .with_partitions(parts)
        .with_cursor(cursor);

    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    assert!(summary.is_success());
    assert_eq!(sink.records("users").len(), 6);

    let stats = summary.stream("users").unwrap();
    assert_eq!(stats.records, 6);
    assert_eq!(stats.partitions_submitted, 3);
    assert_eq!(stats.partitions_succeeded, 3);
    assert_eq!(stats.partitions_failed, 0);
    assert_eq!(stats.generations_completed, 1);

    let states = sink.states("users");
    let last = states.last().unwrap();
    assert_eq!(cursor_position(last), &json!(30));
}

#[tokio::test]
async fn test_stream_without_partitions() {
    let (result, sink) = read(config(), vec![Arc::new(StaticStream::new("empty"))]).await;
    let summary = result.unwrap();

    assert!(summary.is_success());
    assert!(sink.records("empty").is_empty());
    assert_eq!(sink.states("empty"), vec![&json!({"__no_cursor_state": true})]);

    let stats = summary.stream("empty").unwrap();
    assert_eq!(stats.generations_completed, 1);
    assert_eq!(stats.checkpoints, 1);
    assert_eq!(
        sink.statuses("empty"),
        vec![StreamStatus::Started, StreamStatus::Complete]
    );
}

#[tokio::test]
async fn test_partition_fails_mid_read() {
    let cursor = Arc::new(ConcurrentCursor::new("orders", "id", json!(0)));
    let slices = numeric_slices(2, 10);
    let stream = StaticStream::new("orders")
        .with_partition(StaticPartition::new("orders", "p0").with_slice(slices[0].to_slice()))
        .with_partition(
            StaticPartition::new("orders", "p1")
                .with_slice(slices[1].to_slice())
                .with_records(records("orders", 2))
                .with_fail_after(1),
        )
        .with_cursor(cursor);

    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    assert!(!summary.is_success());
    assert_eq!(summary.failed_streams, vec!["orders".to_string()]);
    assert_eq!(sink.records("orders").len(), 1);
    assert_eq!(sink.errors("orders").len(), 1);

    let stats = summary.stream("orders").unwrap();
    assert_eq!(stats.partitions_succeeded, 1);
    assert_eq!(stats.partitions_failed, 1);
    assert_eq!(stats.errors, 1);

    let last = *sink.states("orders").last().unwrap();
    assert_eq!(cursor_position(last), &json!(10));
    assert_eq!(
        sink.statuses("orders").last(),
        Some(&StreamStatus::Incomplete)
    );

    assert!(matches!(
        summary.into_result(),
        Err(Error::StreamsFailed { streams }) if streams == vec!["orders".to_string()]
    ));
}

#[tokio::test]
async fn test_concurrency_never_exceeds_workers() {
    let probe = Arc::new(Probe::default());
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(ProbeStream::new("a", 6, 3, Arc::clone(&probe))),
        Arc::new(ProbeStream::new("b", 4, 2, Arc::clone(&probe))),
    ];
    let config = config().with_workers(2);

    let (result, sink) = read(config, streams).await;
    let summary = result.unwrap();

    assert!(probe.peak.load(AtomicOrdering::SeqCst) <= 2);
    assert!(summary.pool.peak_running <= 2);
    assert_eq!(sink.records("a").len(), 18);
    assert_eq!(sink.records("b").len(), 8);
    assert_eq!(summary.total.records, 26);
    assert_eq!(summary.total.partitions_completed(), 10);
}

// ============================================================================
// Property Tests
// ============================================================================

#[tokio::test]
async fn test_one_sentinel_per_partition() {
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(static_stream("a", 7, 3)),
        Arc::new(
            static_stream("b", 5, 2)
                .with_partition(StaticPartition::new("b", "bad").with_fail_after(0)),
        ),
    ];
    let config = config().with_max_concurrent_generators(2);

    let (result, _sink) = read(config, streams).await;
    let summary = result.unwrap();

    for stats in summary.streams.values() {
        assert_eq!(stats.partitions_completed(), stats.partitions_submitted);
        assert_eq!(stats.generations_completed, 1);
    }
    assert_eq!(summary.pool.in_flight, 0);
    assert_eq!(summary.pool.submitted, summary.pool.finished);
}

#[tokio::test]
async fn test_checkpoints_never_regress() {
    let slices = numeric_slices(12, 5);
    let all: Vec<Value> = (0..60).map(|i| json!({"id": i})).collect();
    let stream = StaticStream::sliced("events", "id", &all, &slices)
        .unwrap()
        .with_cursor(Arc::new(ConcurrentCursor::new("events", "id", json!(0))));

    let (result, sink) = read(config().with_workers(6), vec![Arc::new(stream)]).await;
    assert!(result.unwrap().is_success());

    let states = sink.states("events");
    assert_eq!(states.len(), 13);
    for pair in states.windows(2) {
        let order = compare_cursor_values(cursor_position(pair[0]), cursor_position(pair[1]));
        assert_ne!(order, Some(Ordering::Greater));
    }
    assert_eq!(cursor_position(states[12]), &json!(60));
    assert_eq!(sink.records("events").len(), 60);
}

#[tokio::test]
async fn test_checkpoint_follows_records_it_covers() {
    let stream = StaticStream::new("orders")
        .with_partition(
            StaticPartition::new("orders", "first")
                .with_slice(json!({"start": 0, "end": 10}))
                .with_records(vec![json!({"id": 5})]),
        )
        .with_partition(
            StaticPartition::new("orders", "second")
                .with_slice(json!({"start": 10, "end": 20}))
                .with_records(vec![json!({"id": 15})])
                .with_record_delay(Duration::from_millis(50)),
        )
        .with_cursor(Arc::new(ConcurrentCursor::new("orders", "id", json!(0))));

    let mut sink = SlowSink::default();
    let summary = ConcurrentSource::new(config())
        .read(vec![Arc::new(stream)], &mut sink)
        .await
        .unwrap();
    assert!(summary.is_success());

    let mut delivered = Vec::new();
    for message in sink.inner.messages() {
        match message {
            Message::Record(record) => delivered.push(record.data["id"].as_i64().unwrap()),
            Message::State { data, .. } => {
                let position = cursor_position(data).as_i64().unwrap();
                for id in [5, 15].into_iter().filter(|id| *id < position) {
                    assert!(
                        delivered.contains(&id),
                        "checkpoint at {position} emitted before record {id}"
                    );
                }
            }
            _ => {}
        }
    }

    let last = *sink.inner.states("orders").last().unwrap();
    assert_eq!(cursor_position(last), &json!(20));
}

#[tokio::test]
async fn test_partition_without_slice_fails_on_close() {
    let stream = StaticStream::new("orders")
        .with_partition(StaticPartition::new("orders", "p0").with_records(records("orders", 2)))
        .with_cursor(Arc::new(ConcurrentCursor::new("orders", "id", json!(0))));

    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    assert_eq!(summary.failed_streams, vec!["orders".to_string()]);
    assert_eq!(sink.records("orders").len(), 2);
    assert_eq!(sink.errors("orders").len(), 1);
    assert!(sink.errors("orders")[0].contains("slice bounds"));

    let stats = summary.stream("orders").unwrap();
    assert_eq!(stats.partitions_succeeded, 0);
    assert_eq!(stats.partitions_failed, 1);
    assert_eq!(sink.states("orders").len(), 1);
    assert_eq!(
        sink.statuses("orders").last(),
        Some(&StreamStatus::Incomplete)
    );
}

#[tokio::test]
async fn test_no_records_lost() {
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(static_stream("a", 20, 7)),
        Arc::new(static_stream("b", 3, 50)),
        Arc::new(static_stream("c", 0, 0)),
    ];
    let config = config().with_workers(5).with_max_concurrent_generators(2);

    let (result, sink) = read(config, streams).await;
    let summary = result.unwrap();

    assert_eq!(sink.records("a").len(), 140);
    assert_eq!(sink.records("b").len(), 150);
    assert!(sink.records("c").is_empty());
    assert_eq!(summary.total.records, 290);
}

#[tokio::test]
async fn test_backpressure_bound() {
    let parts = (0..30)
        .map(|i| {
            StaticPartition::new("slow", format!("p{i}"))
                .with_records(records("slow", 2))
                .with_record_delay(Duration::from_millis(2))
        })
        .collect();
    let stream = StaticStream::new("slow").with_partitions(parts);
    let config = config().with_workers(2).with_max_concurrent_tasks(3);

    let (result, sink) = read(config, vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    assert!(summary.pool.peak_in_flight <= 3);
    assert_eq!(sink.records("slow").len(), 60);
}

#[tokio::test]
async fn test_record_order_within_partition() {
    let stream = static_stream("ordered", 4, 25);
    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    result.unwrap();

    let mut last_seen: std::collections::HashMap<String, i64> = Default::default();
    for message in sink.messages() {
        if let Message::Record(record) = message {
            let n = record.data["n"].as_i64().unwrap();
            if let Some(prev) = last_seen.insert(record.partition_id.clone(), n) {
                assert_eq!(n, prev + 1);
            }
        }
    }
    assert_eq!(last_seen.len(), 4);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_status_sequence() {
    let (result, sink) = read(config(), vec![Arc::new(static_stream("users", 2, 2))]).await;
    result.unwrap();

    assert_eq!(
        sink.statuses("users"),
        vec![
            StreamStatus::Started,
            StreamStatus::Running,
            StreamStatus::Complete
        ]
    );
}

#[tokio::test]
async fn test_status_disabled() {
    let config = config().with_stream_status(false);
    let (result, sink) = read(config, vec![Arc::new(static_stream("users", 2, 2))]).await;
    result.unwrap();

    assert!(sink.statuses("users").is_empty());
}

#[test_case(true, 4 ; "per partition")]
#[test_case(false, 1 ; "final only")]
#[tokio::test]
async fn test_checkpoint_frequency(per_partition: bool, expected: usize) {
    let config = config().with_checkpoint_per_partition(per_partition);
    let (result, sink) = read(config, vec![Arc::new(static_stream("users", 3, 1))]).await;
    let summary = result.unwrap();

    assert_eq!(sink.states("users").len(), expected);
    assert_eq!(summary.stream("users").unwrap().checkpoints, expected);
}

#[tokio::test]
async fn test_final_checkpoint_follows_last_record() {
    let (result, sink) = read(config(), vec![Arc::new(static_stream("users", 3, 3))]).await;
    result.unwrap();

    let messages = sink.messages();
    let last_record = messages.iter().rposition(Message::is_record).unwrap();
    let last_state = messages.iter().rposition(Message::is_state).unwrap();
    assert!(last_state > last_record);
}

#[tokio::test]
async fn test_staged_stream_start() {
    let streams: Vec<Arc<dyn Stream>> = (0..4)
        .map(|i| Arc::new(static_stream(&format!("s{i}"), 2, 2)) as Arc<dyn Stream>)
        .collect();
    let config = config().with_workers(2).with_max_concurrent_generators(1);

    let (result, sink) = read(config, streams).await;
    let summary = result.unwrap();

    assert!(summary.is_success());
    assert_eq!(summary.streams.len(), 4);
    for i in 0..4 {
        let name = format!("s{i}");
        assert_eq!(sink.records(&name).len(), 4);
        assert_eq!(sink.statuses(&name).last(), Some(&StreamStatus::Complete));
    }
}

#[tokio::test]
async fn test_no_streams() {
    let (result, sink) = read(config(), Vec::new()).await;
    let summary = result.unwrap();

    assert!(summary.is_success());
    assert!(summary.streams.is_empty());
    assert!(sink.messages().is_empty());
}

#[tokio::test]
async fn test_duplicate_stream_names() {
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(static_stream("users", 1, 1)),
        Arc::new(static_stream("users", 1, 1)),
    ];
    let (result, _sink) = read(config(), streams).await;

    assert!(matches!(result, Err(Error::DuplicateStream { stream }) if stream == "users"));
}

// ============================================================================
// Failure Tests
// ============================================================================

#[tokio::test]
async fn test_generation_failure() {
    let stream = static_stream("users", 3, 2).with_fail_generation_after(1);
    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    assert_eq!(summary.failed_streams, vec!["users".to_string()]);
    assert_eq!(sink.records("users").len(), 2);
    assert_eq!(sink.errors("users").len(), 1);
    assert!(sink.errors("users")[0].contains("generation failed"));

    let stats = summary.stream("users").unwrap();
    assert_eq!(stats.generations_completed, 1);
    assert_eq!(stats.partitions_submitted, 1);
    assert_eq!(
        sink.statuses("users").last(),
        Some(&StreamStatus::Incomplete)
    );
}

#[tokio::test]
async fn test_failed_stream_does_not_affect_others() {
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(static_stream("bad", 2, 2).with_fail_generation_after(0)),
        Arc::new(static_stream("good", 3, 3)),
    ];
    let config = config().with_max_concurrent_generators(2);

    let (result, sink) = read(config, streams).await;
    let summary = result.unwrap();

    assert_eq!(summary.failed_streams, vec!["bad".to_string()]);
    assert_eq!(sink.records("good").len(), 9);
    assert_eq!(sink.statuses("good").last(), Some(&StreamStatus::Complete));
    assert_eq!(sink.states("bad").len(), 1);
}

#[tokio::test]
async fn test_partitions_of_failed_stream_skipped() {
    let stream = StaticStream::new("users")
        .with_partition(StaticPartition::new("users", "p0").with_fail_after(0))
        .with_partition(StaticPartition::new("users", "p1").with_records(records("users", 1)))
        .with_partition(StaticPartition::new("users", "p2").with_records(records("users", 1)))
        .with_partition_delay(Duration::from_millis(50));

    let (result, sink) = read(config(), vec![Arc::new(stream)]).await;
    let summary = result.unwrap();

    let stats = summary.stream("users").unwrap();
    assert!(stats.partitions_skipped >= 1);
    assert_eq!(stats.partitions_skipped + stats.partitions_submitted, 3);
    assert_eq!(stats.partitions_completed(), stats.partitions_submitted);
    assert_eq!(sink.errors("users").len(), 1);
}

#[tokio::test]
async fn test_partition_panic_is_stream_error() {
    let (result, sink) = read(config(), vec![Arc::new(PanickingStream::new("p", false))]).await;
    let summary = result.unwrap();

    assert_eq!(summary.failed_streams, vec!["p".to_string()]);
    let errors = sink.errors("p");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("partition exploded"));
    assert_eq!(summary.stream("p").unwrap().partitions_failed, 1);
}

#[tokio::test]
async fn test_generation_panic_is_stream_error() {
    let streams: Vec<Arc<dyn Stream>> = vec![
        Arc::new(PanickingStream::new("p", true)),
        Arc::new(static_stream("ok", 1, 1)),
    ];
    let (result, sink) = read(config(), streams).await;
    let summary = result.unwrap();

    assert_eq!(summary.failed_streams, vec!["p".to_string()]);
    assert!(sink.errors("p")[0].contains("generator exploded"));
    assert_eq!(summary.stream("p").unwrap().generations_completed, 1);
    assert_eq!(sink.records("ok").len(), 1);
}

#[tokio::test]
async fn test_queue_timeout_is_fatal() {
    let stream = StalledStream {
        cursor: Arc::new(FinalStateCursor::new()),
    };
    let config = config().with_queue_timeout(Duration::from_secs(1));

    let (result, _sink) = read(config, vec![Arc::new(stream)]).await;
    let err = result.unwrap_err();

    assert!(matches!(err, Error::QueueTimeout { timeout_secs: 1 }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_sink_failure_is_fatal() {
    let mut sink = RejectingSink::default();
    let streams: Vec<Arc<dyn Stream>> = vec![Arc::new(static_stream("users", 3, 3))];

    let result = ConcurrentSource::new(config()).read(streams, &mut sink).await;

    assert!(matches!(result, Err(Error::Sink { .. })));
    assert!(sink.accepted >= 1);
}
