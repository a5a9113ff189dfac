//! Error types for streamfan
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use std::sync::Arc;
use thiserror::Error;

/// The main error type for streamfan
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Queue Errors
    // ============================================================================
    #[error("Work queue closed")]
    QueueClosed,

    #[error("No message received from workers within {timeout_secs}s")]
    QueueTimeout { timeout_secs: u64 },

    // ============================================================================
    // Pool Errors
    // ============================================================================
    #[error("Worker pool is shut down: {message}")]
    PoolShutdown { message: String },

    #[error("Worker task '{task}' panicked: {message}")]
    WorkerPanic { task: String, message: String },

    // ============================================================================
    // Stream Errors
    // ============================================================================
    #[error("Stream '{stream}' failed: {message}")]
    Stream { stream: String, message: String },

    #[error("Partition error for stream '{stream}': {message}")]
    Partition { stream: String, message: String },

    #[error("Unknown stream '{stream}'")]
    StreamNotFound { stream: String },

    #[error("Duplicate stream name '{stream}'")]
    DuplicateStream { stream: String },

    #[error("The following streams did not sync successfully: {}", streams.join(", "))]
    StreamsFailed { streams: Vec<String> },

    // ============================================================================
    // Cursor and State Errors
    // ============================================================================
    #[error("Cursor error: {message}")]
    Cursor { message: String },

    #[error("State error: {message}")]
    State { message: String },

    // ============================================================================
    // Sink Errors
    // ============================================================================
    #[error("Sink error: {message}")]
    Sink { message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Shared(#[from] SharedError),
}

/// An error that is both forwarded to the sink and recorded elsewhere
pub type SharedError = Arc<Error>;

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid config value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a stream error
    pub fn stream(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a partition error
    pub fn partition(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Partition {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create a cursor error
    pub fn cursor(message: impl Into<String>) -> Self {
        Self::Cursor {
            message: message.into(),
        }
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State {
            message: message.into(),
        }
    }

    /// Create a sink error
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create a worker panic error
    pub fn worker_panic(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::WorkerPanic {
            task: task.into(),
            message: message.into(),
        }
    }

    /// Whether this error aborts the whole read rather than a single stream
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::QueueClosed
            | Error::QueueTimeout { .. }
            | Error::PoolShutdown { .. }
            | Error::WorkerPanic { .. }
            | Error::Sink { .. } => true,
            Error::Shared(inner) => inner.is_fatal(),
            _ => false,
        }
    }
}

/// Result type alias for streamfan
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

/// Render a panic payload as a message
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::stream("users", "boom");
        assert_eq!(err.to_string(), "Stream 'users' failed: boom");

        let err = Error::StreamsFailed {
            streams: vec!["users".to_string(), "orders".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "The following streams did not sync successfully: users, orders"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(Error::QueueTimeout { timeout_secs: 5 }.is_fatal());
        assert!(Error::worker_panic("reader", "oops").is_fatal());
        assert!(Error::sink("closed").is_fatal());
        assert!(Error::Shared(Arc::new(Error::QueueClosed)).is_fatal());

        assert!(!Error::stream("users", "boom").is_fatal());
        assert!(!Error::partition("users", "boom").is_fatal());
        assert!(!Error::config("bad").is_fatal());
        assert!(!Error::StreamsFailed { streams: vec!["users".to_string()] }.is_fatal());
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::config("inner"));
        let with_context = result.context("outer");
        assert!(with_context
            .unwrap_err()
            .to_string()
            .contains("outer: Configuration error: inner"));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
