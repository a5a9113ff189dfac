//! Stream module
//!
//! The `Stream` trait and its in-memory implementation.

mod static_stream;
mod types;

pub use static_stream::StaticStream;
pub use types::{PartitionStream, Stream};
