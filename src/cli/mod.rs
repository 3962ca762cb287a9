//! CLI module for AcsiDB
//!
//! Provides command-line interface for:
//! - run: Execute a script against the simulated database
//! - check: Parse a script without executing it

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check, run, run_command, run_script};
pub use errors::{CliError, CliErrorCode, CliResult};
