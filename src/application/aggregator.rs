//! Market Aggregator
//!
//! Queries every market data provider concurrently and merges their partial,
//! inconsistent views into one snapshot. For fields several providers
//! report, the most conservative (lowest) value wins; holder and trade
//! counts come from whichever provider exposes them. Absent fields default
//! to 0 but stay unflagged in `reported`, so the risk layer can tell a
//! measured zero from missing data.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::token::{MarketSnapshot, ReportedFields};
use crate::ports::provider::{MarketDataProvider, MarketFields};

pub struct MarketAggregator {
    providers: Vec<Arc<dyn MarketDataProvider>>,
}

impl MarketAggregator {
    pub fn new(providers: Vec<Arc<dyn MarketDataProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Probe every provider concurrently; probe results are cached by the
    /// underlying clients.
    pub async fn health(&self) -> Vec<(String, bool)> {
        let probes = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move { (provider.name().to_string(), provider.healthy().await) }
        });
        join_all(probes).await
    }

    /// Fetch from all providers concurrently and merge whatever succeeded.
    /// If every provider fails the snapshot is empty and the caller skips
    /// persistence for the cycle.
    pub async fn snapshot(&self, address: &str) -> MarketSnapshot {
        let queries = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let address = address.to_string();
            async move {
                let result = provider.market_fields(&address).await;
                (provider.name().to_string(), result)
            }
        });

        let mut reports = Vec::new();
        for (name, result) in join_all(queries).await {
            match result {
                Ok(fields) if !fields.is_empty() => {
                    debug!(provider = %name, %address, "Provider reported fields");
                    reports.push(fields);
                }
                Ok(_) => debug!(provider = %name, %address, "Provider reported nothing"),
                Err(e) => warn!(provider = %name, %address, error = %e, "Provider query failed"),
            }
        }

        Self::merge(address, &reports)
    }

    /// Merge provider reports into one snapshot.
    pub fn merge(address: &str, reports: &[MarketFields]) -> MarketSnapshot {
        let mut snapshot = MarketSnapshot::empty(address);
        snapshot.captured_at = Utc::now();
        if reports.is_empty() {
            return snapshot;
        }

        let mut reported = ReportedFields::default();

        if let Some(price) = lowest(reports.iter().filter_map(|r| r.price)) {
            snapshot.price = price;
            reported.price = true;
        }
        if let Some(market_cap) = lowest(reports.iter().filter_map(|r| r.market_cap)) {
            snapshot.market_cap = market_cap;
            reported.market_cap = true;
        }
        if let Some(volume) = lowest(reports.iter().filter_map(|r| r.volume_24h)) {
            snapshot.volume_24h = volume;
            reported.volume_24h = true;
        }
        if let Some(liquidity) = lowest(reports.iter().filter_map(|r| r.liquidity)) {
            snapshot.liquidity = liquidity;
            reported.liquidity = true;
        }
        if let Some(holders) = reports.iter().filter_map(|r| r.holder_count).min() {
            snapshot.holder_count = holders;
            reported.holder_count = true;
        }

        // Trade counts must come from the same provider so the buy/sell
        // ratio stays internally consistent.
        if let Some(report) = reports
            .iter()
            .find(|r| r.buy_count_24h.is_some() || r.sell_count_24h.is_some())
        {
            snapshot.buy_count_24h = report.buy_count_24h.unwrap_or(0);
            snapshot.sell_count_24h = report.sell_count_24h.unwrap_or(0);
            reported.trade_counts = true;
        }

        // Smallest magnitude is the conservative choice for a change figure
        if let Some(change) = reports
            .iter()
            .filter_map(|r| r.price_change_24h)
            .min_by(|a, b| a.abs().total_cmp(&b.abs()))
        {
            snapshot.price_change_24h = change;
            reported.price_change_24h = true;
        }

        snapshot.reported = reported;
        snapshot
    }
}

fn lowest(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.min_by(|a, b| a.total_cmp(b))
}
