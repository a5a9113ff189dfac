//! State types for tracking read progress
//!
//! These types are serialized to JSON and persisted between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Complete state for a source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Per-stream state
    #[serde(default)]
    pub streams: BTreeMap<String, StreamState>,
}

impl State {
    /// Create a new empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Get state for a stream
    pub fn get_stream(&self, stream: &str) -> Option<&StreamState> {
        self.streams.get(stream)
    }

    /// Get the checkpoint for a stream
    pub fn get_checkpoint(&self, stream: &str) -> Option<&Value> {
        self.streams.get(stream).map(|s| &s.checkpoint)
    }

    /// Replace the checkpoint for a stream
    pub fn set_checkpoint(&mut self, stream: &str, checkpoint: Value) {
        self.streams
            .insert(stream.to_string(), StreamState::new(checkpoint));
    }
}

/// State for a single stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    /// Latest checkpoint emitted by the stream's cursor
    pub checkpoint: Value,

    /// When the checkpoint was recorded
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StreamState {
    /// Create stream state recorded now
    pub fn new(checkpoint: Value) -> Self {
        Self {
            checkpoint,
            updated_at: Some(Utc::now()),
        }
    }
}
