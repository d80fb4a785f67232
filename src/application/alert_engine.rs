//! Alert Engine
//!
//! Threshold rules over consecutive snapshots and scores. Each rule fires at
//! most once per evaluation; before an alert is persisted the store is asked
//! whether the same (token, kind) fired inside the cooldown window, which
//! makes the dedup restart-safe and resolves the insert race at the
//! persistence layer.

use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info};

use crate::domain::alert::{Alert, AlertKind, AlertPriority, RiskVerdict};
use crate::domain::scoring::CompositeScore;
use crate::domain::token::MarketSnapshot;
use crate::ports::persistence::{PersistenceError, TokenStore};

#[derive(Debug, Clone, Deserialize)]
pub struct AlertThresholds {
    /// Price change (%) that fires the price rule
    pub price_change_pct: f64,
    /// Price change (%) at which the price rule escalates to HIGH
    pub price_high_pct: f64,
    /// Volume ratio change that fires the volume rule (0.5 = ±50%)
    pub volume_change_ratio: f64,
    /// Volume ratio change at which the rule escalates to HIGH
    pub volume_high_ratio: f64,
    /// Holder count change (%) that fires the holders rule
    pub holder_change_pct: f64,
    /// Safety/total score delta that fires the security rule
    pub score_delta: f64,
    /// Cooldown window per (token, kind) in minutes
    pub cooldown_minutes: i64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            price_change_pct: 10.0,
            price_high_pct: 50.0,
            volume_change_ratio: 0.5,
            volume_high_ratio: 2.0,
            holder_change_pct: 10.0,
            score_delta: 20.0,
            cooldown_minutes: 30,
        }
    }
}

pub struct AlertEngine {
    store: Arc<dyn TokenStore>,
    thresholds: AlertThresholds,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn TokenStore>, thresholds: AlertThresholds) -> Self {
        Self { store, thresholds }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::minutes(self.thresholds.cooldown_minutes)
    }

    /// Run every rule once; pure, no cooldown applied yet.
    pub fn evaluate(
        &self,
        address: &str,
        snap_now: &MarketSnapshot,
        snap_prev: Option<&MarketSnapshot>,
        score_now: Option<&CompositeScore>,
        score_prev: Option<&CompositeScore>,
    ) -> Vec<Alert> {
        let mut alerts = Vec::new();
        let t = &self.thresholds;

        // Price: snapshot-over-snapshot change when history exists, the
        // provider's 24h figure otherwise.
        let price_change = match snap_prev {
            Some(prev) if prev.price > 0.0 => snap_now.price_change_vs(prev),
            _ => snap_now.price_change_24h,
        };
        if price_change.abs() >= t.price_change_pct {
            let priority = if price_change.abs() >= t.price_high_pct {
                AlertPriority::High
            } else {
                AlertPriority::Medium
            };
            alerts.push(Alert::new(
                address,
                AlertKind::Price,
                priority,
                format!("Price changed by {price_change:+.1}%"),
            ));
        }

        // Volume: ratio of consecutive snapshots
        if let Some(prev) = snap_prev {
            if prev.volume_24h > 0.0 && snap_now.volume_24h > 0.0 {
                let ratio_change = snap_now.volume_24h / prev.volume_24h - 1.0;
                if ratio_change.abs() >= t.volume_change_ratio {
                    let priority = if ratio_change.abs() >= t.volume_high_ratio {
                        AlertPriority::High
                    } else {
                        AlertPriority::Medium
                    };
                    alerts.push(Alert::new(
                        address,
                        AlertKind::Volume,
                        priority,
                        format!("Volume changed by {:+.0}%", ratio_change * 100.0),
                    ));
                }
            }

            // Holders
            if prev.holder_count > 0 && snap_now.reported.holder_count {
                let holder_change = (snap_now.holder_count as f64 - prev.holder_count as f64)
                    / prev.holder_count as f64
                    * 100.0;
                if holder_change.abs() >= t.holder_change_pct {
                    alerts.push(Alert::new(
                        address,
                        AlertKind::Holders,
                        AlertPriority::Medium,
                        format!("Holder count changed by {holder_change:+.0}%"),
                    ));
                }
            }
        }

        // Score: safety or total delta beyond threshold; declining is HIGH
        if let (Some(now), Some(prev)) = (score_now, score_prev) {
            let safety_change = now.safety_composite - prev.safety_composite;
            let total_change = now.total - prev.total;
            if safety_change.abs() >= t.score_delta || total_change.abs() >= t.score_delta {
                let priority = if safety_change < 0.0 || total_change < 0.0 {
                    AlertPriority::High
                } else {
                    AlertPriority::Medium
                };
                alerts.push(Alert::new(
                    address,
                    AlertKind::Security,
                    priority,
                    format!(
                        "Score moved significantly: safety {safety_change:+.0}, total {total_change:+.0}"
                    ),
                ));
            }
        }

        alerts
    }

    /// Evaluate, drop alerts still inside their cooldown window, persist the
    /// rest and return them.
    pub async fn process(
        &self,
        address: &str,
        snap_now: &MarketSnapshot,
        snap_prev: Option<&MarketSnapshot>,
        score_now: Option<&CompositeScore>,
        score_prev: Option<&CompositeScore>,
    ) -> Result<Vec<Alert>, PersistenceError> {
        let candidates = self.evaluate(address, snap_now, snap_prev, score_now, score_prev);
        let mut persisted = Vec::new();

        for alert in candidates {
            let recently_fired = self
                .store
                .exists_alert_since(address, alert.kind, self.cooldown())
                .await?;
            if recently_fired {
                debug!(%address, kind = %alert.kind, "Alert suppressed by cooldown");
                continue;
            }
            self.store.append_alert(&alert).await?;
            info!(%address, kind = %alert.kind, priority = ?alert.priority, "Alert raised");
            persisted.push(alert);
        }

        Ok(persisted)
    }

    /// Aggregate verdict over the alerts of one evaluation.
    pub fn verdict(alerts: &[Alert]) -> RiskVerdict {
        RiskVerdict::from_alerts(alerts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MemoryStore;

    const ADDR: &str = "TokenAddr111111111111111111111111111111111";

    fn engine() -> AlertEngine {
        AlertEngine::new(Arc::new(MemoryStore::new()), AlertThresholds::default())
    }

    fn snapshot(price: f64, volume: f64, holders: u64) -> MarketSnapshot {
        let mut snap = MarketSnapshot::empty(ADDR);
        snap.price = price;
        snap.volume_24h = volume;
        snap.holder_count = holders;
        snap.reported.price = true;
        snap.reported.volume_24h = true;
        snap.reported.holder_count = true;
        snap
    }

    fn score(safety: f64, total: f64) -> CompositeScore {
        CompositeScore {
            address: ADDR.to_string(),
            safety_composite: safety,
            hype_composite: total,
            total,
            verdict: crate::domain::scoring::Verdict::Caution,
            confidence: 0.5,
            scored_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_price_rule_priorities() {
        let e = engine();
        let prev = snapshot(1.0, 1000.0, 100);

        let now = snapshot(1.6, 1000.0, 100); // +60%
        let alerts = e.evaluate(ADDR, &now, Some(&prev), None, None);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Price);
        assert_eq!(alerts[0].priority, AlertPriority::High);

        let now = snapshot(1.2, 1000.0, 100); // +20%
        let alerts = e.evaluate(ADDR, &now, Some(&prev), None, None);
        assert_eq!(alerts[0].priority, AlertPriority::Medium);

        let now = snapshot(1.05, 1000.0, 100); // +5%, below threshold
        assert!(e.evaluate(ADDR, &now, Some(&prev), None, None).is_empty());
    }

    #[test]
    fn test_volume_and_holder_rules() {
        let e = engine();
        let prev = snapshot(1.0, 1000.0, 100);
        let now = snapshot(1.0, 4000.0, 120); // +300% volume, +20% holders

        let alerts = e.evaluate(ADDR, &now, Some(&prev), None, None);
        assert_eq!(alerts.len(), 2);
        assert!(alerts
            .iter()
            .any(|a| a.kind == AlertKind::Volume && a.priority == AlertPriority::High));
        assert!(alerts
            .iter()
            .any(|a| a.kind == AlertKind::Holders && a.priority == AlertPriority::Medium));
    }

    #[test]
    fn test_score_rule_high_when_declining() {
        let e = engine();
        let now = snapshot(1.0, 1000.0, 100);

        let alerts = e.evaluate(
            ADDR,
            &now,
            None,
            Some(&score(40.0, 45.0)),
            Some(&score(70.0, 60.0)),
        );
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].kind, AlertKind::Security);
        assert_eq!(alerts[0].priority, AlertPriority::High);

        // Improving scores fire at MEDIUM
        let alerts = e.evaluate(
            ADDR,
            &now,
            None,
            Some(&score(80.0, 75.0)),
            Some(&score(50.0, 50.0)),
        );
        assert_eq!(alerts[0].priority, AlertPriority::Medium);
    }

    #[test]
    fn test_each_rule_fires_at_most_once() {
        let e = engine();
        let prev = snapshot(1.0, 1000.0, 100);
        let now = snapshot(3.0, 9000.0, 200);

        let alerts = e.evaluate(ADDR, &now, Some(&prev), None, None);
        let price_count = alerts.iter().filter(|a| a.kind == AlertKind::Price).count();
        assert_eq!(price_count, 1);
    }

    #[tokio::test]
    async fn test_cooldown_suppresses_repeat() {
        let store = Arc::new(MemoryStore::new());
        let e = AlertEngine::new(Arc::clone(&store) as Arc<dyn TokenStore>, AlertThresholds::default());
        let prev = snapshot(1.0, 1000.0, 100);
        let now = snapshot(1.6, 1000.0, 100);

        let first = e
            .process(ADDR, &now, Some(&prev), None, None)
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        // Condition persists; the rule may not re-fire inside the window
        let second = e
            .process(ADDR, &now, Some(&prev), None, None)
            .await
            .unwrap();
        assert!(second.is_empty());
        assert_eq!(store.alert_count(), 1);
    }

    #[tokio::test]
    async fn test_refire_after_cooldown_elapses() {
        let store = Arc::new(MemoryStore::new());
        let thresholds = AlertThresholds {
            cooldown_minutes: 0, // window closes immediately
            ..Default::default()
        };
        let e = AlertEngine::new(Arc::clone(&store) as Arc<dyn TokenStore>, thresholds);
        let prev = snapshot(1.0, 1000.0, 100);
        let now = snapshot(1.6, 1000.0, 100);

        e.process(ADDR, &now, Some(&prev), None, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = e
            .process(ADDR, &now, Some(&prev), None, None)
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(store.alert_count(), 2);
    }

    #[test]
    fn test_verdict_from_alerts() {
        let alerts = vec![Alert::new(ADDR, AlertKind::Price, AlertPriority::High, "x")];
        assert_eq!(AlertEngine::verdict(&alerts), RiskVerdict::HighRisk);
        assert_eq!(AlertEngine::verdict(&[]), RiskVerdict::Clear);
    }
}
