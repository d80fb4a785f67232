//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Data providers (market, security, social)
//! - Persistence (append-only snapshot/score/alert store)
//! - Discovery sources (mention scanning)

pub mod discovery;
pub mod mocks;
pub mod persistence;
pub mod provider;

pub use discovery::{DiscoveryScanner, ScanBatch, ScanError};
pub use persistence::{PersistenceError, TokenStore};
pub use provider::{
    MarketDataProvider, MarketFields, ProviderError, SecurityProvider, SecurityReport,
    SocialProvider, SocialStats,
};
