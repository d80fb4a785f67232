//! CLI Adapter
//!
//! Command-line interface for the hunting pipeline.
//! Uses clap derive macros for argument parsing.

mod commands;

pub use commands::{AssessCmd, CliApp, Command, RunCmd, SourcesCmd};
