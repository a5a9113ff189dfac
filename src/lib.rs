// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # streamfan
//!
//! A concurrent partitioned-stream reader.
//!
//! Streams are split into independent partitions which are generated and
//! read in parallel on a bounded worker pool. Everything the workers produce
//! flows through one queue to a single coordinator, which forwards records,
//! tracks per-stream progress and emits checkpoints.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use streamfan::{ConcurrentSource, CollectingSink, StaticPartition, StaticStream, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> streamfan::Result<()> {
//!     let stream = StaticStream::new("users")
//!         .with_partition(StaticPartition::new("users", "p0").with_records(vec![]));
//!
//!     let mut sink = CollectingSink::new();
//!     let summary = ConcurrentSource::new(SyncConfig::default())
//!         .read(vec![Arc::new(stream)], &mut sink)
//!         .await?;
//!
//!     summary.into_result()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  partitions   ┌─────────────┐  readers   ┌──────────────┐
//! │  Enqueuers   │ ────────────▶ │             │ ─────────▶ │   Readers    │
//! │ (per stream) │               │ Coordinator │            │ (per part.)  │
//! └──────────────┘               │             │ ◀───────── └──────────────┘
//!        │                       └─────────────┘  records,         │
//!        └──────── WorkQueue ──────────▲          sentinels ───────┘
//!                                      │
//!                                 MessageSink
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Partitions, records and slicers
pub mod partition;

/// Cursors and checkpoint derivation
pub mod cursor;

/// Streams
pub mod stream;

/// Work queue between workers and the coordinator
pub mod queue;

/// Bounded worker pool
pub mod pool;

/// State management and checkpointing
pub mod state;

/// Message sinks
pub mod sink;

/// Concurrent read engine
pub mod engine;

/// YAML loader for source definitions
pub mod loader;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use cursor::{ConcurrentCursor, Cursor, FinalStateCursor};
pub use engine::{ConcurrentSource, Message, ReadSummary, SyncConfig, SyncStats};
pub use loader::{build_streams, load_source, load_source_from_str, SourceDefinition};
pub use partition::{Partition, Record, StaticPartition};
pub use sink::{CollectingSink, MessageSink, StateSink, WriterSink};
pub use state::StateManager;
pub use stream::{StaticStream, Stream};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
