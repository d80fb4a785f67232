//! Birdeye Adapter
//!
//! Market metrics, holder counts and social momentum from the Birdeye API.
//! Birdeye is the only provider in the set that exposes holder counts and
//! whale transaction data, so the trend layer leans on it for both.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::provider::{
    MarketDataProvider, MarketFields, ProviderError, SocialProvider, SocialStats,
};

use super::client::FetchClient;

pub const DEFAULT_BASE_URL: &str = "https://public-api.birdeye.so";

/// Transactions at or above this USD size count as whale activity.
pub const WHALE_TX_MIN_USD: f64 = 10_000.0;

pub struct BirdeyeClient {
    client: Arc<FetchClient>,
}

impl BirdeyeClient {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    /// Parse the `/v1/token/price` payload.
    pub fn parse_price(raw: &Value) -> MarketFields {
        let data = match raw.get("data") {
            Some(data) if data.is_object() => data,
            _ => return MarketFields::default(),
        };

        MarketFields {
            price: data.get("value").and_then(Value::as_f64),
            market_cap: data.get("marketCap").and_then(Value::as_f64),
            volume_24h: data.get("volume24h").and_then(Value::as_f64),
            liquidity: data.get("liquidity").and_then(Value::as_f64),
            holder_count: data.get("holders").and_then(Value::as_u64),
            buy_count_24h: data.get("buy24h").and_then(Value::as_u64),
            sell_count_24h: data.get("sell24h").and_then(Value::as_u64),
            price_change_24h: data.get("priceChange24h").and_then(Value::as_f64),
        }
    }

    /// Parse the social payload into mention counts and sentiment.
    pub fn parse_social(raw: &Value) -> SocialStats {
        let data = raw.get("data").unwrap_or(raw);
        SocialStats {
            positive_mentions: data
                .get("positiveMentions")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            negative_mentions: data
                .get("negativeMentions")
                .and_then(Value::as_u64)
                .unwrap_or(0),
            sentiment: data.get("sentiment").and_then(Value::as_f64),
            whale_volume_24h: None,
        }
    }

    /// Sum USD volume of whale-sized transactions from the transactions
    /// payload.
    pub fn whale_volume(raw: &Value, min_usd: f64) -> f64 {
        raw.get("data")
            .and_then(Value::as_array)
            .map(|txs| {
                txs.iter()
                    .filter_map(|tx| tx.get("amountUsd").and_then(Value::as_f64))
                    .filter(|amount| *amount >= min_usd)
                    .sum()
            })
            .unwrap_or(0.0)
    }
}

#[async_trait]
impl MarketDataProvider for BirdeyeClient {
    fn name(&self) -> &str {
        "birdeye"
    }

    async fn market_fields(&self, address: &str) -> Result<MarketFields, ProviderError> {
        let cache_key = format!("price_{address}");
        let raw = self
            .client
            .get(
                "/v1/token/price",
                &[("address", address.to_string())],
                Some(&cache_key),
            )
            .await?;
        Ok(Self::parse_price(&raw))
    }

    async fn healthy(&self) -> bool {
        self.client.probe().await
    }
}

#[async_trait]
impl SocialProvider for BirdeyeClient {
    fn name(&self) -> &str {
        "birdeye"
    }

    async fn social_stats(&self, address: &str) -> Result<SocialStats, ProviderError> {
        let cache_key = format!("social_{address}");
        let raw = self
            .client
            .get(
                "/v1/token/social",
                &[("address", address.to_string())],
                Some(&cache_key),
            )
            .await?;
        let mut stats = Self::parse_social(&raw);

        // Whale volume comes from the transactions endpoint; a failure here
        // degrades the stats rather than failing the whole call.
        let txs_key = format!("txs_{address}");
        match self
            .client
            .get(
                "/v1/token/transactions",
                &[("address", address.to_string()), ("limit", "100".to_string())],
                Some(&txs_key),
            )
            .await
        {
            Ok(raw_txs) => {
                stats.whale_volume_24h = Some(Self::whale_volume(&raw_txs, WHALE_TX_MIN_USD));
            }
            Err(e) => {
                tracing::debug!(error = %e, "Whale transaction fetch failed, continuing without");
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_price_payload() {
        let raw = json!({
            "data": {
                "value": 0.003,
                "marketCap": 2500000.0,
                "volume24h": 80000.0,
                "liquidity": 120000.0,
                "priceChange24h": -7.5,
                "holders": 1500,
                "buy24h": 90,
                "sell24h": 60
            }
        });
        let fields = BirdeyeClient::parse_price(&raw);
        assert_eq!(fields.price, Some(0.003));
        assert_eq!(fields.holder_count, Some(1500));
        assert_eq!(fields.buy_count_24h, Some(90));
        assert_eq!(fields.price_change_24h, Some(-7.5));
    }

    #[test]
    fn test_parse_price_missing_data() {
        assert!(BirdeyeClient::parse_price(&json!({})).is_empty());
        assert!(BirdeyeClient::parse_price(&json!({"data": null})).is_empty());
    }

    #[test]
    fn test_partial_fields_stay_none() {
        let raw = json!({"data": {"value": 1.0}});
        let fields = BirdeyeClient::parse_price(&raw);
        assert_eq!(fields.price, Some(1.0));
        assert_eq!(fields.liquidity, None);
        assert_eq!(fields.holder_count, None);
    }

    #[test]
    fn test_parse_social() {
        let raw = json!({
            "data": {"positiveMentions": 12, "negativeMentions": 3, "sentiment": 0.8}
        });
        let stats = BirdeyeClient::parse_social(&raw);
        assert_eq!(stats.positive_mentions, 12);
        assert_eq!(stats.negative_mentions, 3);
        assert_eq!(stats.sentiment, Some(0.8));
        assert_eq!(stats.mention_count(), 15);
    }

    #[test]
    fn test_whale_volume_filters_small_txs() {
        let raw = json!({
            "data": [
                {"amountUsd": 15000.0},
                {"amountUsd": 9999.0},
                {"amountUsd": 40000.0},
                {"other": true}
            ]
        });
        assert_eq!(BirdeyeClient::whale_volume(&raw, WHALE_TX_MIN_USD), 55000.0);
        assert_eq!(BirdeyeClient::whale_volume(&json!({}), WHALE_TX_MIN_USD), 0.0);
    }
}
