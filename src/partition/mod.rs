//! Partition module
//!
//! Supports: the `Partition` trait, records, in-memory partitions, slicers
//!
//! # Overview
//!
//! Partitions split a stream into independently readable units of work:
//! - Date range slices for incremental reads
//! - Numeric id ranges
//! - Static lists of records (tests, demos, fixtures)
//!
//! Each partition is read by exactly one worker.

mod slicer;
mod static_partition;
mod types;

pub use slicer::{
    parse_datetime, parse_duration, DatetimeSlicer, NumericSlicer, SliceBounds, SLICE_END_KEY,
    SLICE_START_KEY,
};
pub use static_partition::StaticPartition;
pub use types::{extract_path, Partition, Record, RecordStream};
