//! CLI command implementations
//!
//! `run` loads the optional config, applies the log level, and streams
//! rendered results to stdout. `check` only parses.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::config::SimulationConfig;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::script::{parse_script, Simulation};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run {
            script,
            config,
            verbose,
        } => run_script(&script, config.as_deref(), verbose),
        Command::Check { script } => check(&script),
    }
}

/// Execute a script file, writing results to stdout
pub fn run_script(script_path: &Path, config_path: Option<&Path>, verbose: bool) -> CliResult<()> {
    let config = load_config(config_path)?;
    let severity = if verbose {
        Severity::Info
    } else {
        config.severity()?
    };
    Logger::set_min_severity(severity);

    let text = read_script(script_path)?;
    let mut simulation = Simulation::new(&config)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = simulation.run_script(&text, &mut out);
    out.flush()?;
    result?;
    Ok(())
}

/// Parse a script file and report the number of commands
pub fn check(script_path: &Path) -> CliResult<()> {
    let text = read_script(script_path)?;
    let commands = parse_script(&text)?;
    println!("{}: {} commands", script_path.display(), commands.len());
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<SimulationConfig> {
    let config = match path {
        Some(path) => {
            let config = SimulationConfig::load(path)?;
            log_event_with_fields(
                Event::ConfigLoaded,
                &[("path", &path.display().to_string())],
            );
            config
        }
        None => SimulationConfig::default(),
    };
    Ok(config)
}

fn read_script(path: &Path) -> CliResult<String> {
    fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn script_file(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_check_valid_script() {
        let file = script_file("begin(T1)\nR(T1, x2)\nend(T1)\n");
        assert!(check(file.path()).is_ok());
    }

    #[test]
    fn test_check_reports_parse_error() {
        let file = script_file("begin(T1)\nR(T1)\n");
        let err = check(file.path()).unwrap_err();
        assert_eq!(err.code_str(), "ACSI_CLI_PARSE_ERROR");
    }

    #[test]
    fn test_missing_script_is_io_error() {
        let err = check(Path::new("/nonexistent/script.txt")).unwrap_err();
        assert_eq!(err.code_str(), "ACSI_CLI_IO_ERROR");
    }

    #[test]
    fn test_bad_config_is_config_error() {
        let script = script_file("dump()\n");
        let config = script_file(r#"{"num_sites": 0}"#);
        let err = run_script(script.path(), Some(config.path()), false).unwrap_err();
        assert_eq!(err.code_str(), "ACSI_CLI_CONFIG_ERROR");
    }
}
