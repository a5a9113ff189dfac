//! YAML Loader module
//!
//! Parse source definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `SourceDefinition` - Read configuration plus stream definitions
//! - `StreamDefinition` - Partitions, cursor and slicer for one stream
//! - YAML parsing with validation, and `build_streams` to turn a
//!   definition into runnable streams

mod parser;
mod types;

pub use parser::{build_streams, load_source, load_source_from_str};
pub use types::{
    CursorDefinition, PartitionDefinition, SlicerDefinition, SourceDefinition, StreamDefinition,
};
