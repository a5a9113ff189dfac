//! Cursor module
//!
//! Per-stream progress tracking and checkpoint derivation.
//!
//! # Overview
//!
//! A cursor is shared by every reader of one stream. Readers call
//! `observe` for each record. The coordinator calls `close_partition` once a
//! partition's records have all been delivered, and `state` to produce a
//! checkpoint.
//!
//! Two invariants hold for every implementation:
//! - checkpoints never regress
//! - only closed partitions can move the checkpoint

mod concurrent;
mod final_state;
mod value;

pub use concurrent::ConcurrentCursor;
pub use final_state::{FinalStateCursor, NO_CURSOR_STATE_KEY};
pub use value::compare_cursor_values;

use crate::error::Result;
use crate::partition::{Partition, Record};
use serde_json::Value;
use std::fmt;

/// Progress tracker for one stream
///
/// Implementations must be internally thread-safe: readers of different
/// partitions of the same stream call `observe` concurrently with the
/// coordinator's `close_partition` and `state`.
pub trait Cursor: Send + Sync + fmt::Debug {
    /// Record that a record was read
    fn observe(&self, record: &Record) -> Result<()>;

    /// Finalise a partition's contribution; called once, after its last record
    fn close_partition(&self, partition: &dyn Partition) -> Result<()>;

    /// Produce a checkpoint snapshot
    fn state(&self) -> Value;
}
