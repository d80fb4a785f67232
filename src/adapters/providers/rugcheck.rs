//! Rugcheck Adapter
//!
//! Contract-safety reports: mint authority, LP lock status, taxes, audit
//! findings, holder concentration and honeypot flags. All of it comes from
//! one report endpoint; the parse isolates Rugcheck's field names from the
//! internal [`SecurityReport`] shape.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::ports::provider::{ProviderError, SecurityProvider, SecurityReport};

use super::client::FetchClient;

pub const DEFAULT_BASE_URL: &str = "https://api.rugcheck.xyz/v1";

pub struct RugcheckClient {
    client: Arc<FetchClient>,
}

impl RugcheckClient {
    pub fn new(client: Arc<FetchClient>) -> Self {
        Self { client }
    }

    /// Parse a token report into a [`SecurityReport`]. Absent fields stay
    /// `None` so the risk layer can tell "not reported" from "false".
    pub fn parse(raw: &Value) -> SecurityReport {
        let lp = raw.get("liquidity");
        let audit = raw.get("audit");

        // A token counts as locked when any pair is; the lock horizon is the
        // longest lock across pairs.
        let (lp_locked, lp_lock_days) = match lp.and_then(|l| l.get("pairs")).and_then(Value::as_array)
        {
            Some(pairs) if !pairs.is_empty() => {
                let locked = pairs
                    .iter()
                    .any(|p| p.get("is_locked").and_then(Value::as_bool).unwrap_or(false));
                let days = pairs
                    .iter()
                    .filter_map(|p| p.get("lock_time_days").and_then(Value::as_f64))
                    .fold(0.0f64, f64::max);
                (Some(locked), Some(days))
            }
            _ => (None, None),
        };

        SecurityReport {
            mint_disabled: raw.get("is_mint_disabled").and_then(Value::as_bool),
            lp_locked,
            lp_lock_days,
            buy_tax: raw.get("buy_tax").and_then(Value::as_f64),
            sell_tax: raw.get("sell_tax").and_then(Value::as_f64),
            audited: audit.and_then(|a| a.get("has_audit")).and_then(Value::as_bool),
            major_issues: audit
                .and_then(|a| a.get("major_issues"))
                .and_then(Value::as_u64)
                .map(|v| v as u32),
            critical_issues: audit
                .and_then(|a| a.get("critical_issues"))
                .and_then(Value::as_u64)
                .map(|v| v as u32),
            whale_holder_pct: raw.get("top_holders_percent").and_then(Value::as_f64),
            whale_count: raw
                .get("whale_count")
                .and_then(Value::as_u64)
                .map(|v| v as u32),
            holder_count: raw.get("holder_count").and_then(Value::as_u64),
            is_honeypot: raw.get("is_honeypot").and_then(Value::as_bool),
        }
    }
}

#[async_trait]
impl SecurityProvider for RugcheckClient {
    fn name(&self) -> &str {
        "rugcheck"
    }

    async fn security_report(&self, address: &str) -> Result<SecurityReport, ProviderError> {
        let path = format!("/token/{address}/report");
        let cache_key = format!("security_{address}");
        let raw = self.client.get(&path, &[], Some(&cache_key)).await?;
        Ok(Self::parse(&raw))
    }

    async fn healthy(&self) -> bool {
        self.client.probe().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report_payload() -> Value {
        json!({
            "is_mint_disabled": true,
            "buy_tax": 0.02,
            "sell_tax": 0.05,
            "top_holders_percent": 0.35,
            "whale_count": 3,
            "holder_count": 820,
            "is_honeypot": false,
            "liquidity": {
                "pairs": [
                    {"is_locked": true, "lock_time_days": 180.0},
                    {"is_locked": false, "lock_time_days": 0.0}
                ]
            },
            "audit": {"has_audit": true, "major_issues": 0, "critical_issues": 0}
        })
    }

    #[test]
    fn test_parse_full_report() {
        let report = RugcheckClient::parse(&report_payload());
        assert_eq!(report.mint_disabled, Some(true));
        assert_eq!(report.lp_locked, Some(true));
        assert_eq!(report.lp_lock_days, Some(180.0));
        assert_eq!(report.buy_tax, Some(0.02));
        assert_eq!(report.sell_tax, Some(0.05));
        assert_eq!(report.audited, Some(true));
        assert_eq!(report.major_issues, Some(0));
        assert_eq!(report.whale_holder_pct, Some(0.35));
        assert_eq!(report.holder_count, Some(820));
        assert_eq!(report.is_honeypot, Some(false));
    }

    #[test]
    fn test_parse_empty_report_stays_none() {
        let report = RugcheckClient::parse(&json!({}));
        assert_eq!(report.mint_disabled, None);
        assert_eq!(report.lp_locked, None);
        assert_eq!(report.buy_tax, None);
        assert_eq!(report.is_honeypot, None);
    }

    #[test]
    fn test_unlocked_pairs() {
        let raw = json!({
            "liquidity": {"pairs": [{"is_locked": false, "lock_time_days": 0.0}]}
        });
        let report = RugcheckClient::parse(&raw);
        assert_eq!(report.lp_locked, Some(false));
        assert_eq!(report.lp_lock_days, Some(0.0));
    }
}
