//! YAML parser for source definitions
//!
//! Parses and validates source YAML files and turns them into streams.

use crate::cursor::{compare_cursor_values, ConcurrentCursor, Cursor};
use crate::error::{Error, Result, ResultExt};
use crate::loader::types::{
    CursorDefinition, SlicerDefinition, SourceDefinition, StreamDefinition,
};
use crate::partition::{
    DatetimeSlicer, NumericSlicer, SliceBounds, StaticPartition, SLICE_END_KEY, SLICE_START_KEY,
};
use crate::state::State;
use crate::stream::{StaticStream, Stream};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Load a source definition from a file path
pub fn load_source(path: impl AsRef<Path>) -> Result<SourceDefinition> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read source file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_source_from_str(&content)
}

/// Load a source definition from a YAML string
pub fn load_source_from_str(yaml: &str) -> Result<SourceDefinition> {
    let def: SourceDefinition = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse source YAML: {e}")))?;

    validate_source(&def)?;
    Ok(def)
}

/// Validate a source definition
fn validate_source(def: &SourceDefinition) -> Result<()> {
    if def.name.is_empty() {
        return Err(Error::config("Source name cannot be empty"));
    }

    if def.streams.is_empty() {
        return Err(Error::config("Source must have at least one stream"));
    }

    def.sync.validate()?;

    let stream_names: HashSet<_> = def.streams.iter().map(|s| &s.name).collect();
    if stream_names.len() != def.streams.len() {
        return Err(Error::config("Duplicate stream names found"));
    }

    for stream in &def.streams {
        validate_stream(stream)?;
    }

    Ok(())
}

/// Validate a stream definition
fn validate_stream(stream: &StreamDefinition) -> Result<()> {
    if stream.name.is_empty() {
        return Err(Error::config("Stream name cannot be empty"));
    }

    if let Some(cursor) = &stream.cursor {
        if cursor.field.is_empty() {
            return Err(Error::config(format!(
                "Stream '{}' cursor field cannot be empty",
                stream.name
            )));
        }

        // The cursor closes partitions by their slice bounds
        let start_key = cursor.start_key.as_deref().unwrap_or(SLICE_START_KEY);
        let end_key = cursor.end_key.as_deref().unwrap_or(SLICE_END_KEY);
        let unbounded = stream.partitions.iter().find(|p| {
            p.slice
                .as_ref()
                .and_then(|slice| SliceBounds::from_slice(slice, start_key, end_key))
                .is_none()
        });
        if let Some(partition) = unbounded {
            return Err(Error::config(format!(
                "Stream '{}' partition '{}' needs a '{start_key}'/'{end_key}' slice for its cursor",
                stream.name, partition.id
            )));
        }
    }

    if let Some(slicer) = &stream.slicer {
        if stream.cursor.is_none() {
            return Err(Error::config(format!(
                "Stream '{}' uses a slicer and needs a cursor",
                stream.name
            )));
        }
        if !stream.partitions.is_empty() {
            return Err(Error::config(format!(
                "Stream '{}' cannot define both a slicer and explicit partitions",
                stream.name
            )));
        }
        slices(slicer)
            .with_context(|| format!("Stream '{}' has an invalid slicer", stream.name))?;
    } else if !stream.records.is_empty() {
        return Err(Error::config(format!(
            "Stream '{}' defines records without a slicer; put them in a partition",
            stream.name
        )));
    }

    let ids: HashSet<_> = stream.partitions.iter().map(|p| &p.id).collect();
    if ids.len() != stream.partitions.len() {
        return Err(Error::config(format!(
            "Stream '{}' has duplicate partition ids",
            stream.name
        )));
    }
    if stream.partitions.iter().any(|p| p.id.is_empty()) {
        return Err(Error::config(format!(
            "Stream '{}' has a partition without an id",
            stream.name
        )));
    }

    Ok(())
}

/// Build runnable streams from a definition
///
/// Incremental streams resume from the checkpoints in `state`; sliced
/// streams then skip slices that end at or before the checkpoint.
pub fn build_streams(
    def: &SourceDefinition,
    state: Option<&State>,
) -> Result<Vec<Arc<dyn Stream>>> {
    def.streams
        .iter()
        .map(|stream| {
            let checkpoint = state.and_then(|s| s.get_checkpoint(&stream.name));
            build_stream(stream, checkpoint).map(|s| Arc::new(s) as Arc<dyn Stream>)
        })
        .collect()
}

fn build_stream(
    def: &StreamDefinition,
    checkpoint: Option<&serde_json::Value>,
) -> Result<StaticStream> {
    let cursor = def
        .cursor
        .as_ref()
        .map(|c| build_cursor(&def.name, c, checkpoint))
        .transpose()?;

    let mut stream = match (&def.slicer, &cursor) {
        (Some(slicer), Some(cursor)) => {
            let mut bounds = slices(slicer)?;
            let position = cursor.checkpoint();
            let before = bounds.len();
            bounds.retain(|b| compare_cursor_values(&b.end, &position) == Some(Ordering::Greater));
            if bounds.len() < before {
                debug!(
                    stream = %def.name,
                    skipped = before - bounds.len(),
                    "Skipping slices covered by checkpoint"
                );
            }
            StaticStream::sliced(&def.name, cursor.cursor_field(), &def.records, &bounds)?
        }
        (Some(_), None) => {
            return Err(Error::config(format!(
                "Stream '{}' uses a slicer and needs a cursor",
                def.name
            )))
        }
        (None, _) => {
            let partitions = def
                .partitions
                .iter()
                .map(|p| {
                    let mut partition =
                        StaticPartition::new(&def.name, &p.id).with_records(p.records.clone());
                    if let Some(slice) = &p.slice {
                        partition = partition.with_slice(slice.clone());
                    }
                    if let Some(n) = p.fail_after {
                        partition = partition.with_fail_after(n);
                    }
                    if let Some(ms) = p.record_delay_ms {
                        partition = partition.with_record_delay(Duration::from_millis(ms));
                    }
                    partition
                })
                .collect();
            StaticStream::new(&def.name).with_partitions(partitions)
        }
    };

    if let Some(cursor) = cursor {
        stream = stream.with_cursor(cursor as Arc<dyn Cursor>);
    }
    if let Some(n) = def.fail_generation_after {
        stream = stream.with_fail_generation_after(n);
    }
    if let Some(ms) = def.partition_delay_ms {
        stream = stream.with_partition_delay(Duration::from_millis(ms));
    }

    Ok(stream)
}

fn build_cursor(
    stream: &str,
    def: &CursorDefinition,
    checkpoint: Option<&serde_json::Value>,
) -> Result<Arc<ConcurrentCursor>> {
    let mut cursor = match checkpoint {
        Some(checkpoint) => {
            ConcurrentCursor::from_state(stream, &def.field, checkpoint, def.start.clone())?
        }
        None => ConcurrentCursor::new(stream, &def.field, def.start.clone()),
    };

    if def.start_key.is_some() || def.end_key.is_some() {
        cursor = cursor.with_slice_keys(
            def.start_key.as_deref().unwrap_or(SLICE_START_KEY),
            def.end_key.as_deref().unwrap_or(SLICE_END_KEY),
        );
    }

    Ok(Arc::new(cursor))
}

fn slices(def: &SlicerDefinition) -> Result<Vec<SliceBounds>> {
    match def {
        SlicerDefinition::Datetime {
            start,
            end,
            step,
            format,
        } => {
            let mut slicer = DatetimeSlicer::from_strings(start, end, step)?;
            if let Some(format) = format {
                slicer = slicer.with_format(format);
            }
            slicer.slices()
        }
        SlicerDefinition::Numeric { start, end, step } => {
            Ok(NumericSlicer::new(*start, *end, *step)?.slices())
        }
    }
}
