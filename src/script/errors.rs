//! Script driver error types
//!
//! Parse errors carry the 1-based line number. Coordinator usage errors
//! (unknown transaction, unknown site) stop the run.

use std::io;

use thiserror::Error;

use crate::coordinator::CoordinatorError;

/// Result type for script operations
pub type ScriptResult<T> = Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

impl ScriptError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Re-labels a parse error with the line it came from.
    pub(crate) fn at_line(self, line: usize) -> Self {
        match self {
            Self::Parse { message, .. } => Self::Parse { line, message },
            other => other,
        }
    }
}
