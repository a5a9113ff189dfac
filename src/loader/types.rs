//! Loader types
//!
//! Declarative source definition types for YAML parsing.

use crate::engine::SyncConfig;
use crate::types::SyncMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Source Definition
// ============================================================================

/// Top-level source definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SourceDefinition {
    /// Source name
    pub name: String,
    /// Source version
    #[serde(default = "default_version")]
    pub version: String,
    /// Read configuration
    #[serde(default)]
    pub sync: SyncConfig,
    /// Stream definitions
    pub streams: Vec<StreamDefinition>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

impl SourceDefinition {
    /// Find a stream definition by name
    pub fn stream(&self, name: &str) -> Option<&StreamDefinition> {
        self.streams.iter().find(|s| s.name == name)
    }
}

// ============================================================================
// Stream Definition
// ============================================================================

/// Stream definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StreamDefinition {
    /// Stream name
    pub name: String,
    /// Incremental cursor; full refresh when absent
    #[serde(default)]
    pub cursor: Option<CursorDefinition>,
    /// Explicit partitions
    #[serde(default)]
    pub partitions: Vec<PartitionDefinition>,
    /// Generate partitions by slicing `records` on the cursor field
    #[serde(default)]
    pub slicer: Option<SlicerDefinition>,
    /// Records distributed over sliced partitions
    #[serde(default)]
    pub records: Vec<Value>,
    /// Fail partition generation after this many partitions
    #[serde(default)]
    pub fail_generation_after: Option<usize>,
    /// Pause before each partition is generated, in milliseconds
    #[serde(default)]
    pub partition_delay_ms: Option<u64>,
}

impl StreamDefinition {
    /// Incremental when a cursor is configured
    pub fn sync_mode(&self) -> SyncMode {
        if self.cursor.is_some() {
            SyncMode::Incremental
        } else {
            SyncMode::FullRefresh
        }
    }
}

/// Incremental cursor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CursorDefinition {
    /// Record field holding the cursor value (dot notation)
    pub field: String,
    /// Lower bound when no checkpoint exists
    pub start: Value,
    /// Slice key holding the partition's start bound
    #[serde(default)]
    pub start_key: Option<String>,
    /// Slice key holding the partition's end bound
    #[serde(default)]
    pub end_key: Option<String>,
}

/// Explicit partition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PartitionDefinition {
    /// Partition id, unique within the stream
    pub id: String,
    /// Slice descriptor
    #[serde(default)]
    pub slice: Option<Value>,
    /// Records served by the partition
    #[serde(default)]
    pub records: Vec<Value>,
    /// Fail after yielding this many records
    #[serde(default)]
    pub fail_after: Option<usize>,
    /// Pause before each record, in milliseconds
    #[serde(default)]
    pub record_delay_ms: Option<u64>,
}

/// Slicer definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlicerDefinition {
    /// Date/time range
    Datetime {
        /// Start date
        start: String,
        /// End date ("now" accepted)
        end: String,
        /// Step (e.g., "1d", "1h", "1w")
        step: String,
        /// Output format
        #[serde(default)]
        format: Option<String>,
    },
    /// Integer range
    Numeric {
        /// Start value
        start: i64,
        /// End value (exclusive)
        end: i64,
        /// Step
        step: i64,
    },
}
