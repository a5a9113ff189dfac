//! Cursor for full refresh streams

use super::Cursor;
use crate::error::Result;
use crate::partition::{Partition, Record};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Key marking a checkpoint that carries no cursor position
pub const NO_CURSOR_STATE_KEY: &str = "__no_cursor_state";

/// Cursor for streams without an incremental cursor field
///
/// Its checkpoint is constant; it only exists so that every stream emits a
/// checkpoint once it is done.
#[derive(Debug, Default)]
pub struct FinalStateCursor {
    closed_partitions: AtomicUsize,
}

impl FinalStateCursor {
    /// Create a new final state cursor
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of partitions closed so far
    pub fn closed_partitions(&self) -> usize {
        self.closed_partitions.load(Ordering::SeqCst)
    }
}

impl Cursor for FinalStateCursor {
    fn observe(&self, _record: &Record) -> Result<()> {
        Ok(())
    }

    fn close_partition(&self, _partition: &dyn Partition) -> Result<()> {
        self.closed_partitions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn state(&self) -> Value {
        json!({ NO_CURSOR_STATE_KEY: true })
    }
}
