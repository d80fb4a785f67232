//! Dexscreener Adapter
//!
//! Market data from the Dexscreener pairs endpoint. A token usually trades
//! in several pairs; the pair with the deepest liquidity is taken as the
//! reference and its metrics become the provider's view of the token.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::provider::{MarketDataProvider, MarketFields, ProviderError};

use super::client::FetchClient;

pub const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com/latest";

pub struct DexscreenerClient {
    client: Arc<FetchClient>,
}

impl DexscreenerClient {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    /// Parse the pairs payload into market fields, using the Solana pair
    /// with the highest liquidity.
    pub fn parse(raw: &Value) -> MarketFields {
        let pairs = match raw.get("pairs").and_then(Value::as_array) {
            Some(pairs) => pairs,
            None => return MarketFields::default(),
        };

        let best = pairs
            .iter()
            .filter(|p| p.get("chainId").and_then(Value::as_str) == Some("solana"))
            .max_by(|a, b| {
                let la = field_f64(a, &["liquidity", "usd"]).unwrap_or(0.0);
                let lb = field_f64(b, &["liquidity", "usd"]).unwrap_or(0.0);
                la.total_cmp(&lb)
            });

        let Some(pair) = best else {
            return MarketFields::default();
        };

        MarketFields {
            price: field_f64(pair, &["priceUsd"]),
            market_cap: field_f64(pair, &["marketCap"]).or_else(|| field_f64(pair, &["fdv"])),
            volume_24h: field_f64(pair, &["volume", "h24"]),
            liquidity: field_f64(pair, &["liquidity", "usd"]),
            holder_count: None, // Dexscreener does not expose holders
            buy_count_24h: field_u64(pair, &["txns", "h24", "buys"]),
            sell_count_24h: field_u64(pair, &["txns", "h24", "sells"]),
            price_change_24h: field_f64(pair, &["priceChange", "h24"]),
        }
    }
}

/// Navigate a JSON path and coerce the leaf to f64. Dexscreener reports
/// some numeric fields as strings.
fn field_f64(value: &Value, path: &[&str]) -> Option<f64> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    match current {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn field_u64(value: &Value, path: &[&str]) -> Option<u64> {
    field_f64(value, path).map(|f| f.max(0.0) as u64)
}

#[async_trait]
impl MarketDataProvider for DexscreenerClient {
    fn name(&self) -> &str {
        "dexscreener"
    }

    async fn market_fields(&self, address: &str) -> Result<MarketFields, ProviderError> {
        let path = format!("/dex/tokens/{address}");
        let cache_key = format!("pairs_{address}");
        let raw = self.client.get(&path, &[], Some(&cache_key)).await?;
        Ok(Self::parse(&raw))
    }

    async fn healthy(&self) -> bool {
        self.client.probe().await
    }
}
