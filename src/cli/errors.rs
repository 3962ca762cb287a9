//! CLI-specific error types
//!
//! All CLI errors are fatal: `main` prints them and exits non-zero.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::script::ScriptError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (script file, stdout)
    IoError,
    /// Malformed script line
    ParseError,
    /// Script used an unknown transaction or site
    UsageError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ACSI_CLI_CONFIG_ERROR",
            Self::IoError => "ACSI_CLI_IO_ERROR",
            Self::ParseError => "ACSI_CLI_PARSE_ERROR",
            Self::UsageError => "ACSI_CLI_USAGE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ParseError, msg)
    }

    /// Usage error
    pub fn usage_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::UsageError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ScriptError> for CliError {
    fn from(e: ScriptError) -> Self {
        match e {
            ScriptError::Parse { .. } => Self::parse_error(e.to_string()),
            ScriptError::Coordinator(_) => Self::usage_error(e.to_string()),
            ScriptError::Io(_) => Self::io_error(e.to_string()),
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::CoordinatorError;
    use crate::model::TransactionId;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::io_error("no such file");
        assert_eq!(err.to_string(), "ACSI_CLI_IO_ERROR: no such file");
    }

    #[test]
    fn test_script_error_mapping() {
        let parse: CliError = ScriptError::Parse {
            line: 3,
            message: "unknown command 'x'".into(),
        }
        .into();
        assert_eq!(parse.code(), &CliErrorCode::ParseError);
        assert_eq!(parse.message(), "line 3: unknown command 'x'");

        let usage: CliError =
            ScriptError::Coordinator(CoordinatorError::UnknownTransaction(TransactionId::new(4)))
                .into();
        assert_eq!(usage.code_str(), "ACSI_CLI_USAGE_ERROR");
    }

    #[test]
    fn test_config_error_mapping() {
        let err: CliError = ConfigError::Invalid("num_sites must be > 0".into()).into();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
