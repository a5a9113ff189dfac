//! Cursor for incremental streams read concurrently
//!
//! Partitions finish in any order, so the cursor cannot simply keep the
//! highest value it has seen. It keeps the set of closed slices, merges
//! overlapping or touching ones, and only moves the checkpoint to the end of
//! the merged range that starts at the lower bound. A slice that closes
//! early, ahead of a gap, is remembered but does not move the checkpoint
//! until the gap is filled.

use super::value::compare_cursor_values;
use super::Cursor;
use crate::error::{Error, Result};
use crate::partition::{Partition, Record, SliceBounds, SLICE_END_KEY, SLICE_START_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A fully read `[start, end)` range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClosedSlice {
    start: Value,
    end: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    most_recent_cursor_value: Option<Value>,
}

#[derive(Debug)]
struct CursorState {
    /// Where the contiguous closed range has to begin
    lower_bound: Value,
    /// Last externally visible position
    checkpoint: Value,
    /// Closed slices, sorted by start and merged
    closed: Vec<ClosedSlice>,
    /// Highest cursor value seen per open partition
    most_recent: HashMap<String, Value>,
}

/// Cursor that advances over contiguous closed slices
#[derive(Debug)]
pub struct ConcurrentCursor {
    stream: String,
    cursor_field: String,
    start_key: String,
    end_key: String,
    state: Mutex<CursorState>,
}

impl ConcurrentCursor {
    /// Create a cursor starting at `start`
    pub fn new(
        stream: impl Into<String>,
        cursor_field: impl Into<String>,
        start: impl Into<Value>,
    ) -> Self {
        let start = start.into();
        Self {
            stream: stream.into(),
            cursor_field: cursor_field.into(),
            start_key: SLICE_START_KEY.to_string(),
            end_key: SLICE_END_KEY.to_string(),
            state: Mutex::new(CursorState {
                lower_bound: start.clone(),
                checkpoint: start,
                closed: Vec::new(),
                most_recent: HashMap::new(),
            }),
        }
    }

    /// Resume from a checkpoint previously produced by `state`
    ///
    /// The checkpoint's `cursor` becomes the lower bound; `default_start` is
    /// used when the checkpoint has none.
    pub fn from_state(
        stream: impl Into<String>,
        cursor_field: impl Into<String>,
        checkpoint: &Value,
        default_start: impl Into<Value>,
    ) -> Result<Self> {
        let start = checkpoint
            .get("cursor")
            .filter(|v| !v.is_null())
            .cloned()
            .unwrap_or_else(|| default_start.into());
        let cursor = Self::new(stream, cursor_field, start);

        let slices: Vec<ClosedSlice> = match checkpoint.get("slices") {
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| Error::cursor(format!("Invalid slices in checkpoint: {e}")))?,
            None => Vec::new(),
        };

        {
            let mut state = cursor.lock();
            for slice in slices {
                state.insert(slice)?;
            }
            state.advance();
        }

        Ok(cursor)
    }

    /// Use different keys to read slice bounds from partitions
    #[must_use]
    pub fn with_slice_keys(
        mut self,
        start_key: impl Into<String>,
        end_key: impl Into<String>,
    ) -> Self {
        self.start_key = start_key.into();
        self.end_key = end_key.into();
        self
    }

    /// The cursor field records are tracked by
    pub fn cursor_field(&self) -> &str {
        &self.cursor_field
    }

    /// Current checkpoint position
    pub fn checkpoint(&self) -> Value {
        self.lock().checkpoint.clone()
    }

    fn lock(&self) -> MutexGuard<'_, CursorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cursor for ConcurrentCursor {
    fn observe(&self, record: &Record) -> Result<()> {
        let Some(value) = record.get(&self.cursor_field).filter(|v| !v.is_null()) else {
            return Ok(());
        };

        let mut state = self.lock();
        match state.most_recent.entry(record.partition_id.clone()) {
            Entry::Occupied(mut current) => {
                if cmp(value, current.get())? == Ordering::Greater {
                    current.insert(value.clone());
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(value.clone());
            }
        }
        Ok(())
    }

    fn close_partition(&self, partition: &dyn Partition) -> Result<()> {
        let bounds = partition
            .to_slice()
            .and_then(|slice| SliceBounds::from_slice(&slice, &self.start_key, &self.end_key))
            .ok_or_else(|| {
                Error::cursor(format!(
                    "Partition '{}' of stream '{}' has no '{}'/'{}' slice bounds",
                    partition.id(),
                    self.stream,
                    self.start_key,
                    self.end_key
                ))
            })?;

        let mut state = self.lock();
        let most_recent = state.most_recent.remove(partition.id());
        state.insert(ClosedSlice {
            start: bounds.start,
            end: bounds.end,
            most_recent_cursor_value: most_recent,
        })?;
        state.advance();
        Ok(())
    }

    fn state(&self) -> Value {
        let state = self.lock();
        json!({
            "cursor_field": self.cursor_field,
            "cursor": state.checkpoint,
            "slices": state.closed,
        })
    }
}

impl CursorState {
    /// Add a closed slice, keeping the list sorted and merged
    fn insert(&mut self, slice: ClosedSlice) -> Result<()> {
        if cmp(&slice.start, &slice.end)? == Ordering::Greater {
            return Err(Error::cursor(format!(
                "Slice start {} is after its end {}",
                slice.start, slice.end
            )));
        }
        cmp(&slice.start, &self.lower_bound)?;

        self.closed.push(slice);
        self.closed.sort_by(|a, b| {
            compare_cursor_values(&a.start, &b.start).unwrap_or(Ordering::Equal)
        });

        let mut merged: Vec<ClosedSlice> = Vec::with_capacity(self.closed.len());
        for slice in self.closed.drain(..) {
            if let Some(last) = merged.last_mut() {
                if !is_greater(&slice.start, &last.end) {
                    if is_greater(&slice.end, &last.end) {
                        last.end = slice.end;
                    }
                    last.most_recent_cursor_value = max_value(
                        last.most_recent_cursor_value.take(),
                        slice.most_recent_cursor_value,
                    );
                    continue;
                }
            }
            merged.push(slice);
        }
        self.closed = merged;
        Ok(())
    }

    /// Move the checkpoint to the end of the range contiguous with the lower bound
    fn advance(&mut self) {
        if let Some(first) = self.closed.first() {
            if !is_greater(&first.start, &self.lower_bound)
                && is_greater(&first.end, &self.checkpoint)
            {
                self.checkpoint = first.end.clone();
            }
        }
    }
}

fn cmp(a: &Value, b: &Value) -> Result<Ordering> {
    compare_cursor_values(a, b)
        .ok_or_else(|| Error::cursor(format!("Cannot compare cursor values {a} and {b}")))
}

fn is_greater(a: &Value, b: &Value) -> bool {
    compare_cursor_values(a, b) == Some(Ordering::Greater)
}

fn max_value(a: Option<Value>, b: Option<Value>) -> Option<Value> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if is_greater(&b, &a) { b } else { a }),
        (a, b) => a.or(b),
    }
}
