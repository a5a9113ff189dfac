//! State management module
//!
//! Persists the latest checkpoint of every stream between runs so that
//! incremental reads can resume.
//!
//! # Overview
//!
//! The state module provides:
//! - `State` - Per-stream checkpoints
//! - `StateManager` - File-based state persistence

mod manager;
mod types;

pub use manager::StateManager;
pub use types::{State, StreamState};
