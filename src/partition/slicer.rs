//! Slice boundary generators
//!
//! A slicer splits a cursor range into consecutive `[start, end)` slices.
//! Each slice becomes one partition, and the slice bounds are what the
//! concurrent cursor merges to advance its checkpoint.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde_json::{json, Value};

/// Default key for the lower slice bound
pub const SLICE_START_KEY: &str = "start";

/// Default key for the upper slice bound
pub const SLICE_END_KEY: &str = "end";

/// A single `[start, end)` range
#[derive(Debug, Clone, PartialEq)]
pub struct SliceBounds {
    /// Inclusive lower bound
    pub start: Value,
    /// Exclusive upper bound
    pub end: Value,
}

impl SliceBounds {
    /// Create slice bounds
    pub fn new(start: impl Into<Value>, end: impl Into<Value>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Render as a slice descriptor using the default keys
    pub fn to_slice(&self) -> Value {
        json!({ SLICE_START_KEY: self.start, SLICE_END_KEY: self.end })
    }

    /// Read bounds back out of a slice descriptor
    pub fn from_slice(slice: &Value, start_key: &str, end_key: &str) -> Option<Self> {
        Some(Self {
            start: slice.get(start_key)?.clone(),
            end: slice.get(end_key)?.clone(),
        })
    }
}

// ============================================================================
// Datetime Slicer
// ============================================================================

/// Splits a datetime range into fixed steps
#[derive(Debug, Clone)]
pub struct DatetimeSlicer {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
    format: String,
}

impl DatetimeSlicer {
    /// Create a new datetime slicer
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, step: Duration) -> Self {
        Self {
            start,
            end,
            step,
            format: "%Y-%m-%dT%H:%M:%SZ".to_string(),
        }
    }

    /// Create from string values ("now" is accepted as the end)
    pub fn from_strings(start: &str, end: &str, step: &str) -> Result<Self> {
        let start_dt = parse_datetime(start)?;
        let end_dt = if end == "now" {
            Utc::now()
        } else {
            parse_datetime(end)?
        };
        let step_dur = parse_duration(step)?;
        if step_dur <= Duration::zero() {
            return Err(Error::invalid_value("step", "must be positive"));
        }

        Ok(Self::new(start_dt, end_dt, step_dur))
    }

    /// Override the output format
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Produce the slices; the last one is clipped to the end
    pub fn slices(&self) -> Result<Vec<SliceBounds>> {
        let mut slices = Vec::new();
        let mut current = self.start;

        while current < self.end {
            let next = current
                .checked_add_signed(self.step)
                .ok_or_else(|| {
                    Error::invalid_value("step", format!("{} overflows from {current}", self.step))
                })?
                .min(self.end);
            slices.push(SliceBounds::new(
                current.format(&self.format).to_string(),
                next.format(&self.format).to_string(),
            ));
            current = next;
        }

        Ok(slices)
    }
}

// ============================================================================
// Numeric Slicer
// ============================================================================

/// Splits an integer range into fixed steps
#[derive(Debug, Clone, Copy)]
pub struct NumericSlicer {
    start: i64,
    end: i64,
    step: i64,
}

impl NumericSlicer {
    /// Create a new numeric slicer
    pub fn new(start: i64, end: i64, step: i64) -> Result<Self> {
        if step <= 0 {
            return Err(Error::invalid_value("step", "must be positive"));
        }
        Ok(Self { start, end, step })
    }

    /// Produce the slices; the last one is clipped to the end
    pub fn slices(&self) -> Vec<SliceBounds> {
        let mut slices = Vec::new();
        let mut current = self.start;
        while current < self.end {
            let next = current.saturating_add(self.step).min(self.end);
            slices.push(SliceBounds::new(current, next));
            current = next;
        }
        slices
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a datetime string into UTC DateTime
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ndt.and_utc());
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(nd) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(ndt) = nd.and_hms_opt(0, 0, 0) {
                return Ok(ndt.and_utc());
            }
        }
    }

    Err(Error::config(format!("Invalid datetime format: {s}")))
}

/// Parse a duration string like "1d", "2h", "30m"
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit() && c != '-')
        .unwrap_or(s.len());
    let (num_str, suffix) = s.split_at(split);

    let num: i64 = num_str
        .parse()
        .map_err(|_| Error::config(format!("Invalid duration number: {num_str}")))?;

    let duration = match suffix {
        "w" => Duration::try_weeks(num),
        "" | "d" => Duration::try_days(num),
        "h" => Duration::try_hours(num),
        "m" => Duration::try_minutes(num),
        "s" => Duration::try_seconds(num),
        other => return Err(Error::config(format!("Invalid duration suffix: {other}"))),
    };
    duration.ok_or_else(|| Error::invalid_value("step", format!("duration {s} is out of range")))
}
