//! Provider Port
//!
//! Trait abstractions over third-party data providers. Each provider adapter
//! parses its own wire format into the fixed internal field structs defined
//! here, isolating schema drift to the adapter.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider failure taxonomy.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider returned 429 or an explicit rate-limit signal
    #[error("Rate limited by provider")]
    RateLimited,

    /// Request timed out
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Connection-level failure (DNS, refused, reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider answered with an error status
    #[error("Remote error: HTTP {status}: {message}")]
    Remote { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Transient errors are worth retrying with backoff; everything else
    /// fails the request immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout(_) | ProviderError::Transport(_) => true,
            ProviderError::Remote { status, .. } => *status >= 500,
            ProviderError::RateLimited | ProviderError::Decode(_) => false,
        }
    }
}

/// Normalized market fields as one provider reports them. `None` means the
/// provider does not expose the field, never a measured zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketFields {
    pub price: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume_24h: Option<f64>,
    pub liquidity: Option<f64>,
    pub holder_count: Option<u64>,
    pub buy_count_24h: Option<u64>,
    pub sell_count_24h: Option<u64>,
    pub price_change_24h: Option<f64>,
}

impl MarketFields {
    /// True when the provider reported nothing usable.
    pub fn is_empty(&self) -> bool {
        self.price.is_none()
            && self.market_cap.is_none()
            && self.volume_24h.is_none()
            && self.liquidity.is_none()
            && self.holder_count.is_none()
            && self.buy_count_24h.is_none()
            && self.sell_count_24h.is_none()
            && self.price_change_24h.is_none()
    }
}

/// Contract-safety data as reported by a security provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityReport {
    pub mint_disabled: Option<bool>,
    pub lp_locked: Option<bool>,
    pub lp_lock_days: Option<f64>,
    /// Buy tax as a fraction (0.05 = 5%)
    pub buy_tax: Option<f64>,
    /// Sell tax as a fraction
    pub sell_tax: Option<f64>,
    pub audited: Option<bool>,
    pub major_issues: Option<u32>,
    pub critical_issues: Option<u32>,
    /// Combined share of supply held by whale wallets, as a fraction
    pub whale_holder_pct: Option<f64>,
    pub whale_count: Option<u32>,
    pub holder_count: Option<u64>,
    pub is_honeypot: Option<bool>,
}

/// Social momentum data for a token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialStats {
    pub positive_mentions: u64,
    pub negative_mentions: u64,
    /// Overall sentiment in [0, 1], when the provider computes one
    pub sentiment: Option<f64>,
    /// USD volume of whale-sized transactions in the last 24h
    pub whale_volume_24h: Option<f64>,
}

impl SocialStats {
    pub fn mention_count(&self) -> u64 {
        self.positive_mentions + self.negative_mentions
    }

    /// Sentiment ratio from mention counts; `None` with no mentions.
    pub fn sentiment_ratio(&self) -> Option<f64> {
        let total = self.mention_count();
        if total == 0 {
            return None;
        }
        Some(self.positive_mentions as f64 / total as f64)
    }
}

/// A provider of per-token market metrics.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch current market fields for a token.
    async fn market_fields(&self, address: &str) -> Result<MarketFields, ProviderError>;

    /// Probe provider health; implementations cache the result.
    async fn healthy(&self) -> bool;
}

/// A provider of contract-safety reports.
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn security_report(&self, address: &str) -> Result<SecurityReport, ProviderError>;

    async fn healthy(&self) -> bool;
}

/// A provider of social momentum data.
#[async_trait]
pub trait SocialProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn social_stats(&self, address: &str) -> Result<SocialStats, ProviderError>;
}
