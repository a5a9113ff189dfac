//! Common types used throughout streamfan
//!
//! This module contains shared type definitions used across multiple
//! modules.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Sync Mode
// ============================================================================

/// Synchronization mode for streams, derived from whether a stream has a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Full refresh - read every partition every time
    #[default]
    FullRefresh,
    /// Incremental - resume from the last checkpoint
    Incremental,
}

// ============================================================================
// Stream Status
// ============================================================================

/// Lifecycle status reported for each stream during a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamStatus {
    /// Partition generation has started
    Started,
    /// The first record has been delivered
    Running,
    /// All partitions were read successfully
    Complete,
    /// The stream finished with at least one error
    Incomplete,
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StreamStatus::Started => "STARTED",
            StreamStatus::Running => "RUNNING",
            StreamStatus::Complete => "COMPLETE",
            StreamStatus::Incomplete => "INCOMPLETE",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Log Level
// ============================================================================

/// Log level for engine messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}
