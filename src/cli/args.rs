//! CLI argument definitions using clap
//!
//! Commands:
//! - acsidb run <script> [--config <path>] [--verbose]
//! - acsidb check <script>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AcsiDB - replicated snapshot-isolation transaction simulator
#[derive(Parser, Debug)]
#[command(name = "acsidb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a script and print results to stdout
    Run {
        /// Path to the script file
        script: PathBuf,

        /// Path to configuration file (defaults apply if omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log protocol events at INFO and above to stderr
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse a script without executing it
    Check {
        /// Path to the script file
        script: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from(["acsidb", "run", "in.txt", "--config", "c.json", "-v"])
            .unwrap();
        match cli.command {
            Command::Run {
                script,
                config,
                verbose,
            } => {
                assert_eq!(script, PathBuf::from("in.txt"));
                assert_eq!(config, Some(PathBuf::from("c.json")));
                assert!(verbose);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["acsidb", "check", "in.txt"]).unwrap();
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn test_script_required() {
        assert!(Cli::try_parse_from(["acsidb", "run"]).is_err());
    }
}
