//! CLI Command Definitions
//!
//! Command-line surface for the hunting pipeline: the monitoring loop, a
//! one-shot token assessment, and a source listing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Alpha Hunter - token discovery, risk scoring and alerting pipeline
#[derive(Parser, Debug)]
#[command(
    name = "alpha-hunter",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Token discovery, risk scoring and alerting pipeline",
    long_about = "Alpha Hunter polls discovery sources for token mentions, merges \
                  provider market data, scores risk and momentum, and fans alerts \
                  out to subscribers."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the monitoring pipeline
    Run(RunCmd),

    /// Assess a single token and print its scores
    Assess(AssessCmd),

    /// List configured discovery sources
    Sources(SourcesCmd),
}

/// Start the monitoring pipeline
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Override data directory for the JSONL store
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Skip source scanning; only refresh already-tracked tokens
    #[arg(long)]
    pub no_scan: bool,
}

/// Assess a single token
#[derive(Parser, Debug)]
pub struct AssessCmd {
    /// Token mint address
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, value_name = "FORMAT", default_value = "text")]
    pub format: String,
}

/// List configured discovery sources
#[derive(Parser, Debug)]
pub struct SourcesCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let args = vec!["alpha-hunter", "run", "--config", "test.toml"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("test.toml"));
                assert!(!cmd.no_scan);
                assert!(cmd.data_dir.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let args = vec!["alpha-hunter", "run"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Run(cmd) => assert_eq!(cmd.config, PathBuf::from("config.toml")),
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_assess() {
        let args = vec!["alpha-hunter", "assess", "So1anaMintAddr", "--format", "json"];
        let app = CliApp::try_parse_from(args).unwrap();

        match app.command {
            Command::Assess(cmd) => {
                assert_eq!(cmd.address, "So1anaMintAddr");
                assert_eq!(cmd.format, "json");
            }
            _ => panic!("Expected Assess command"),
        }
    }

    #[test]
    fn test_parse_sources() {
        let args = vec!["alpha-hunter", "sources"];
        let app = CliApp::try_parse_from(args).unwrap();
        assert!(matches!(app.command, Command::Sources(_)));
    }

    #[test]
    fn test_global_flags() {
        let args = vec!["alpha-hunter", "-v", "--debug", "sources"];
        let app = CliApp::try_parse_from(args).unwrap();
        assert!(app.verbose);
        assert!(app.debug);
    }
}
