//! CLI module
//!
//! Command-line interface for running source definitions.
//!
//! # Commands
//!
//! - `read` - Read every stream concurrently and print the messages
//! - `validate` - Load and validate a source definition

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
