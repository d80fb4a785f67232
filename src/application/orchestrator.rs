//! Monitor Orchestrator
//!
//! Owns the tracked-token set. New tokens pass a validation gate (minimum
//! liquidity, minimum holders, owner concentration, honeypot flag) before
//! tracking starts. Each tick refreshes snapshot, trend and score for every
//! tracked token with bounded concurrency; one token's failure never aborts
//! the cycle for the others. Cycles with significant movement broadcast the
//! delta, and a cycle where every provider fails re-broadcasts the last
//! known data marked stale instead of persisting zeros.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, error, info, warn};

use crate::domain::scoring::{CompositeScore, Scorer};
use crate::domain::token::{MarketSnapshot, Token};
use crate::domain::trend::{TrendEngine, TrendSignals};
use crate::ports::persistence::{PersistenceError, TokenStore};
use crate::ports::provider::{SecurityProvider, SocialProvider};

use super::aggregator::MarketAggregator;
use super::alert_engine::AlertEngine;
use super::broadcast::{BroadcastHub, Event, MovementDelta, TokenUpdate, Topic};
use super::risk_engine::RiskEngine;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Token {address} rejected by validation gate: {reason}")]
    GateRejected { address: String, reason: String },

    #[error("Token {0} is denylisted")]
    Denylisted(String),

    #[error("Token {0} is already tracked")]
    AlreadyTracked(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Validation-gate parameters. These are configuration inputs; the gate
/// logic itself lives here but the numbers belong to the operator.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub min_liquidity_usd: f64,
    pub min_holders: u64,
    /// Maximum combined whale/owner share of supply, as a fraction
    pub max_owner_concentration: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 1_000.0,
            min_holders: 50,
            max_owner_concentration: 0.5,
        }
    }
}

/// Tokens taxing either side at or above this fraction never pass the gate.
const GATE_MAX_TAX: f64 = 0.15;

/// Per-call overrides for the gate.
#[derive(Debug, Clone, Default)]
pub struct GateOverrides {
    pub min_liquidity_usd: Option<f64>,
    pub min_holders: Option<u64>,
    pub max_owner_concentration: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Added,
    Refreshing,
    Idle,
}

#[derive(Debug, Clone)]
struct TrackedToken {
    token: Token,
    state: TokenState,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub tick_interval: Duration,
    pub max_concurrent_refreshes: usize,
    /// Price move (%) between cycles that counts as significant
    pub significant_price_pct: f64,
    /// Volume move (%) between cycles that counts as significant
    pub significant_volume_pct: f64,
    pub gate: GateConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            max_concurrent_refreshes: 8,
            significant_price_pct: 5.0,
            significant_volume_pct: 20.0,
            gate: GateConfig::default(),
        }
    }
}

/// Status snapshot for the operator surface.
#[derive(Debug, Clone)]
pub struct MonitorStatus {
    pub is_running: bool,
    pub tracked_count: usize,
    pub denylisted_count: usize,
}

pub struct MonitorOrchestrator {
    aggregator: Arc<MarketAggregator>,
    risk_engine: Arc<RiskEngine>,
    trend: TrendEngine,
    scorer: Scorer,
    alert_engine: Arc<AlertEngine>,
    security: Arc<dyn SecurityProvider>,
    social: Arc<dyn SocialProvider>,
    store: Arc<dyn TokenStore>,
    hub: Arc<BroadcastHub>,
    config: MonitorConfig,
    tracked: RwLock<HashMap<String, TrackedToken>>,
    denylist: RwLock<HashSet<String>>,
    is_running: RwLock<bool>,
    refresh_slots: Semaphore,
}

impl MonitorOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aggregator: Arc<MarketAggregator>,
        risk_engine: Arc<RiskEngine>,
        trend: TrendEngine,
        scorer: Scorer,
        alert_engine: Arc<AlertEngine>,
        security: Arc<dyn SecurityProvider>,
        social: Arc<dyn SocialProvider>,
        store: Arc<dyn TokenStore>,
        hub: Arc<BroadcastHub>,
        config: MonitorConfig,
    ) -> Self {
        let slots = config.max_concurrent_refreshes.max(1);
        Self {
            aggregator,
            risk_engine,
            trend,
            scorer,
            alert_engine,
            security,
            social,
            store,
            hub,
            config,
            tracked: RwLock::new(HashMap::new()),
            denylist: RwLock::new(HashSet::new()),
            is_running: RwLock::new(false),
            refresh_slots: Semaphore::new(slots),
        }
    }

    /// Add a token through the validation gate. On success the token is
    /// tracked, its first snapshot and score are persisted, and an update is
    /// broadcast.
    pub async fn add(&self, address: &str, overrides: GateOverrides) -> Result<(), MonitorError> {
        if self.denylist.read().await.contains(address) {
            return Err(MonitorError::Denylisted(address.to_string()));
        }
        if self.tracked.read().await.contains_key(address) {
            return Err(MonitorError::AlreadyTracked(address.to_string()));
        }

        let min_liquidity = overrides
            .min_liquidity_usd
            .unwrap_or(self.config.gate.min_liquidity_usd);
        let min_holders = overrides.min_holders.unwrap_or(self.config.gate.min_holders);
        let max_concentration = overrides
            .max_owner_concentration
            .unwrap_or(self.config.gate.max_owner_concentration);

        let (snapshot, security) = tokio::join!(
            self.aggregator.snapshot(address),
            self.security.security_report(address),
        );

        if snapshot.is_empty() {
            return Err(MonitorError::GateRejected {
                address: address.to_string(),
                reason: "no market data from any provider".to_string(),
            });
        }
        if snapshot.liquidity < min_liquidity {
            return Err(MonitorError::GateRejected {
                address: address.to_string(),
                reason: format!(
                    "liquidity ${:.0} below minimum ${min_liquidity:.0}",
                    snapshot.liquidity
                ),
            });
        }

        let holders = if snapshot.reported.holder_count {
            Some(snapshot.holder_count)
        } else {
            security.as_ref().ok().and_then(|r| r.holder_count)
        };
        if let Some(holders) = holders {
            if holders < min_holders {
                return Err(MonitorError::GateRejected {
                    address: address.to_string(),
                    reason: format!("{holders} holders below minimum {min_holders}"),
                });
            }
        }

        if let Ok(report) = &security {
            if report.is_honeypot == Some(true) {
                self.denylist.write().await.insert(address.to_string());
                return Err(MonitorError::GateRejected {
                    address: address.to_string(),
                    reason: "flagged as honeypot".to_string(),
                });
            }
            if let Some(concentration) = report.whale_holder_pct {
                if concentration > max_concentration {
                    return Err(MonitorError::GateRejected {
                        address: address.to_string(),
                        reason: format!(
                            "owner concentration {:.0}% above maximum {:.0}%",
                            concentration * 100.0,
                            max_concentration * 100.0
                        ),
                    });
                }
            }
            let max_tax = report
                .buy_tax
                .unwrap_or(0.0)
                .max(report.sell_tax.unwrap_or(0.0));
            if max_tax >= GATE_MAX_TAX {
                return Err(MonitorError::GateRejected {
                    address: address.to_string(),
                    reason: format!("tax rate {:.0}% at or above rejection threshold", max_tax * 100.0),
                });
            }
        }

        let token = Token::new(address);
        self.store.upsert_token(&token).await?;
        self.store.append_snapshot(&snapshot).await?;

        let score = self.score_cycle(address, &snapshot, None).await;
        self.store.append_score(&score).await?;

        self.tracked.write().await.insert(
            address.to_string(),
            TrackedToken {
                token,
                state: TokenState::Added,
            },
        );

        self.hub
            .publish(
                Topic::TokenUpdates,
                Event::TokenUpdate(TokenUpdate {
                    snapshot,
                    score: Some(score),
                    stale: false,
                }),
            )
            .await;

        info!(%address, "Token added to monitoring");
        Ok(())
    }

    /// Stop tracking a token.
    pub async fn remove(&self, address: &str) -> bool {
        let removed = self.tracked.write().await.remove(address).is_some();
        if removed {
            info!(%address, "Token removed from monitoring");
        }
        removed
    }

    /// Denylist a token; it is removed and can never be re-added.
    pub async fn deny(&self, address: &str) {
        self.denylist.write().await.insert(address.to_string());
        self.remove(address).await;
    }

    /// Run the refresh loop until stopped.
    pub async fn run(&self) {
        *self.is_running.write().await = true;
        info!(
            interval_secs = self.config.tick_interval.as_secs(),
            "Monitor orchestrator started"
        );

        while *self.is_running.read().await {
            self.tick().await;
            tokio::time::sleep(self.config.tick_interval).await;
        }

        info!("Monitor orchestrator stopped");
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
    }

    /// One refresh cycle over every tracked token, bounded by the refresh
    /// semaphore. Failures are isolated per token.
    pub async fn tick(&self) {
        let addresses: Vec<String> = self.tracked.read().await.keys().cloned().collect();
        if addresses.is_empty() {
            return;
        }
        debug!(tokens = addresses.len(), "Refresh tick");

        let refreshes = addresses.into_iter().map(|address| async move {
            let _permit = self.refresh_slots.acquire().await;
            if let Err(e) = self.refresh_token(&address).await {
                error!(%address, error = %e, "Token refresh failed");
            }
        });
        join_all(refreshes).await;
    }

    async fn set_state(&self, address: &str, state: TokenState) {
        if let Some(entry) = self.tracked.write().await.get_mut(address) {
            entry.state = state;
        }
    }

    /// Refresh one token: snapshot, trend, score, alerts, broadcasts.
    pub async fn refresh_token(&self, address: &str) -> Result<(), MonitorError> {
        self.set_state(address, TokenState::Refreshing).await;

        let snapshot = self.aggregator.snapshot(address).await;

        if snapshot.is_empty() {
            // Every provider failed: keep the last known data, mark it
            // stale in the broadcast, and skip persistence this cycle.
            warn!(%address, "All providers failed; broadcasting stale data");
            if let Some(last) = self.store.latest_snapshot(address).await? {
                let score = self.store.latest_score(address).await?;
                self.hub
                    .publish(
                        Topic::TokenUpdates,
                        Event::TokenUpdate(TokenUpdate {
                            snapshot: last,
                            score,
                            stale: true,
                        }),
                    )
                    .await;
            }
            self.set_state(address, TokenState::Idle).await;
            return Ok(());
        }

        // Previous cycle's records, read before this cycle's writes
        let prev_snapshot = self.store.latest_snapshot(address).await?;
        let prev_score = self.store.latest_score(address).await?;

        self.store.append_snapshot(&snapshot).await?;

        let score = self
            .score_cycle(address, &snapshot, prev_snapshot.as_ref())
            .await;
        self.store.append_score(&score).await?;

        let alerts = self
            .alert_engine
            .process(
                address,
                &snapshot,
                prev_snapshot.as_ref(),
                Some(&score),
                prev_score.as_ref(),
            )
            .await?;
        for alert in &alerts {
            self.hub
                .publish(Topic::Alerts, Event::Alert(alert.clone()))
                .await;
        }

        if let Some(prev) = &prev_snapshot {
            let price_change = snapshot.price_change_vs(prev);
            let volume_change = snapshot.volume_change_vs(prev);
            if price_change.abs() >= self.config.significant_price_pct
                || volume_change.abs() >= self.config.significant_volume_pct
            {
                info!(%address, price_change, volume_change, "Significant movement");
                self.hub
                    .publish(
                        Topic::Analytics,
                        Event::Movement(MovementDelta {
                            address: address.to_string(),
                            price_change_pct: price_change,
                            volume_change_pct: volume_change,
                        }),
                    )
                    .await;
            }
        }

        self.hub
            .publish(
                Topic::TokenUpdates,
                Event::TokenUpdate(TokenUpdate {
                    snapshot,
                    score: Some(score),
                    stale: false,
                }),
            )
            .await;

        self.set_state(address, TokenState::Idle).await;
        Ok(())
    }

    /// Risk + trend + composite score for one cycle.
    async fn score_cycle(
        &self,
        address: &str,
        snapshot: &MarketSnapshot,
        prev: Option<&MarketSnapshot>,
    ) -> CompositeScore {
        let (assessment, social) = tokio::join!(
            self.risk_engine.assess(address),
            self.social.social_stats(address),
        );

        let (whale_volume, mention_count, sentiment) = match &social {
            Ok(stats) => (
                stats.whale_volume_24h.unwrap_or(0.0),
                stats.mention_count() as usize,
                stats
                    .sentiment
                    .or_else(|| stats.sentiment_ratio())
                    .unwrap_or(0.0),
            ),
            Err(e) => {
                debug!(%address, error = %e, "Social stats unavailable for trend");
                (0.0, 0, 0.0)
            }
        };

        let signals = TrendSignals {
            volume: self
                .trend
                .volume_score(snapshot.volume_24h, prev.map(|p| p.volume_24h)),
            holders: self
                .trend
                .holder_score(snapshot.holder_count, prev.map(|p| p.holder_count)),
            whale: self.trend.whale_score(whale_volume, snapshot.volume_24h),
            social: self.trend.social_score(mention_count, sentiment),
        };

        self.scorer.score(&assessment, &signals, snapshot)
    }

    /// State of one tracked token, if tracked.
    pub async fn token_state(&self, address: &str) -> Option<TokenState> {
        self.tracked.read().await.get(address).map(|t| t.state)
    }

    pub async fn tracked_addresses(&self) -> Vec<String> {
        self.tracked.read().await.keys().cloned().collect()
    }

    pub async fn tracked_tokens(&self) -> Vec<Token> {
        self.tracked
            .read()
            .await
            .values()
            .map(|t| t.token.clone())
            .collect()
    }

    pub async fn status(&self) -> MonitorStatus {
        MonitorStatus {
            is_running: *self.is_running.read().await,
            tracked_count: self.tracked.read().await.len(),
            denylisted_count: self.denylist.read().await.len(),
        }
    }
}
