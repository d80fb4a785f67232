//! Provider Adapters
//!
//! The [`FetchClient`] request executor (rate limiting, caching, retry,
//! health probing) plus one adapter per third-party provider. Adapters own
//! their wire-format parsing; everything past this module speaks the
//! internal field structs from the ports layer.

pub mod birdeye;
pub mod client;
pub mod dexscreener;
pub mod rate_limit;
pub mod retry;
pub mod rugcheck;

pub use birdeye::BirdeyeClient;
pub use client::{FetchClient, FetchClientConfig, MetricsSnapshot};
pub use dexscreener::DexscreenerClient;
pub use rate_limit::RateLimiter;
pub use retry::{retry_async, RetryPolicy};
pub use rugcheck::RugcheckClient;
