//! Stream trait
//!
//! A stream is a named, logical data source that enumerates partitions.

use crate::cursor::Cursor;
use crate::error::Result;
use crate::partition::Partition;
use futures::stream::BoxStream;
use std::sync::Arc;

/// Lazy, finite sequence of partitions generated for one stream
pub type PartitionStream = BoxStream<'static, Result<Box<dyn Partition>>>;

/// A named data source read concurrently partition by partition
pub trait Stream: Send + Sync {
    /// Stream name, unique within one read
    fn name(&self) -> &str;

    /// Enumerate the stream's partitions
    ///
    /// Calling this again restarts generation from the beginning.
    fn generate_partitions(&self) -> PartitionStream;

    /// The stream's cursor; the same instance for the whole read
    fn cursor(&self) -> Arc<dyn Cursor>;
}
