//! Script driver
//!
//! Parses the line-oriented command language and runs it against a
//! `Coordinator`, rendering results as text.

mod errors;
mod parser;
mod runner;

pub use errors::{ScriptError, ScriptResult};
pub use parser::{parse_line, parse_script, Command};
pub use runner::Simulation;
