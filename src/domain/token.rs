//! Token and Market Snapshot Types
//!
//! Core entities for the monitoring pipeline: the token identity record and
//! the append-only per-cycle capture of its market metrics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A token under observation, keyed by its mint address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Mint address (unique key)
    pub address: String,
    /// Token name, if known
    pub name: Option<String>,
    /// Token symbol, if known
    pub symbol: Option<String>,
    /// When the token was first discovered
    pub first_seen: DateTime<Utc>,
    /// Last time any data for the token was refreshed
    pub last_updated: DateTime<Utc>,
    /// Denylisted tokens are never re-added by the scanner
    pub denylisted: bool,
}

impl Token {
    pub fn new(address: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            address: address.into(),
            name: None,
            symbol: None,
            first_seen: now,
            last_updated: now,
            denylisted: false,
        }
    }

    pub fn with_identity(mut self, name: impl Into<String>, symbol: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self.symbol = Some(symbol.into());
        self
    }
}

/// Which snapshot fields were actually reported by at least one provider.
///
/// Unreported fields default to 0 in the snapshot; the risk layer uses these
/// flags to distinguish a measured zero from missing data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedFields {
    pub price: bool,
    pub market_cap: bool,
    pub volume_24h: bool,
    pub liquidity: bool,
    pub holder_count: bool,
    pub trade_counts: bool,
    pub price_change_24h: bool,
}

impl ReportedFields {
    /// True when no provider reported anything this cycle.
    pub fn is_empty(&self) -> bool {
        !(self.price
            || self.market_cap
            || self.volume_24h
            || self.liquidity
            || self.holder_count
            || self.trade_counts
            || self.price_change_24h)
    }
}

/// One time-stamped capture of a token's market metrics.
///
/// Snapshots are append-only and immutable once written; the store keeps them
/// strictly ordered by `captured_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Token mint address
    pub address: String,
    /// Capture time
    pub captured_at: DateTime<Utc>,
    /// Price in USD
    pub price: f64,
    /// Market capitalization in USD
    pub market_cap: f64,
    /// 24-hour trading volume in USD
    pub volume_24h: f64,
    /// Liquidity in USD
    pub liquidity: f64,
    /// Number of holders
    pub holder_count: u64,
    /// Buy transactions in the last 24 hours
    pub buy_count_24h: u64,
    /// Sell transactions in the last 24 hours
    pub sell_count_24h: u64,
    /// 24-hour price change percentage
    pub price_change_24h: f64,
    /// Which fields carry provider-reported values
    pub reported: ReportedFields,
}

impl MarketSnapshot {
    /// Create an empty snapshot for a token (no provider data).
    pub fn empty(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            captured_at: Utc::now(),
            price: 0.0,
            market_cap: 0.0,
            volume_24h: 0.0,
            liquidity: 0.0,
            holder_count: 0,
            buy_count_24h: 0,
            sell_count_24h: 0,
            price_change_24h: 0.0,
            reported: ReportedFields::default(),
        }
    }

    /// True when every provider failed and nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.reported.is_empty()
    }

    /// Percentage change of `current` relative to `previous`; 0 when the
    /// previous value is 0.
    pub fn pct_change(previous: f64, current: f64) -> f64 {
        if previous == 0.0 {
            return 0.0;
        }
        (current - previous) / previous * 100.0
    }

    /// Price change percentage versus a prior snapshot.
    pub fn price_change_vs(&self, previous: &MarketSnapshot) -> f64 {
        Self::pct_change(previous.price, self.price)
    }

    /// Volume change percentage versus a prior snapshot.
    pub fn volume_change_vs(&self, previous: &MarketSnapshot) -> f64 {
        Self::pct_change(previous.volume_24h, self.volume_24h)
    }

    /// Buy/sell transaction ratio; sells are floored at 1 to avoid division
    /// by zero.
    pub fn buy_sell_ratio(&self) -> f64 {
        self.buy_count_24h as f64 / (self.sell_count_24h.max(1)) as f64
    }
}
