//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Providers: rate-limited fetch client plus Dexscreener, Birdeye and
//!   Rugcheck adapters
//! - Sources: per-kind discovery scanners and the kind router
//! - Persistence: JSONL append-only store
//! - CLI: command-line interface

pub mod cli;
pub mod persistence;
pub mod providers;
pub mod sources;

pub use cli::CliApp;
pub use persistence::JsonlStore;
pub use providers::{FetchClient, FetchClientConfig};
pub use sources::ScannerRouter;
