//! Test Doubles for Ports
//!
//! Call-recording providers with controlled responses and a fully functional
//! in-memory [`TokenStore`]. Used by unit tests across the application layer
//! and by the integration suite; the memory store is also handy for ad hoc
//! runs without a data directory.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::domain::alert::{Alert, AlertKind};
use crate::domain::scoring::CompositeScore;
use crate::domain::token::{MarketSnapshot, Token};

use super::persistence::{PersistenceError, TokenStore};
use super::provider::{
    MarketDataProvider, MarketFields, ProviderError, SecurityProvider, SecurityReport,
    SocialProvider, SocialStats,
};

/// Mock market data provider with per-address canned fields.
pub struct MockMarketProvider {
    name: String,
    calls: Mutex<Vec<String>>,
    responses: Mutex<HashMap<String, MarketFields>>,
    fail_with: Mutex<Option<fn() -> ProviderError>>,
}

impl MockMarketProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            fail_with: Mutex::new(None),
        }
    }

    /// Builder method to set the fields returned for an address.
    pub fn with_fields(self, address: &str, fields: MarketFields) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(address.to_string(), fields);
        self
    }

    /// Make every call fail with the given error constructor.
    pub fn failing(self, make: fn() -> ProviderError) -> Self {
        *self.fail_with.lock().unwrap() = Some(make);
        self
    }

    /// Replace the canned fields for an address after construction.
    pub fn set_fields(&self, address: &str, fields: MarketFields) {
        self.responses
            .lock()
            .unwrap()
            .insert(address.to_string(), fields);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn market_fields(&self, address: &str) -> Result<MarketFields, ProviderError> {
        self.calls.lock().unwrap().push(address.to_string());
        if let Some(make) = *self.fail_with.lock().unwrap() {
            return Err(make());
        }
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn healthy(&self) -> bool {
        self.fail_with.lock().unwrap().is_none()
    }
}

/// Mock security provider with one canned report.
pub struct MockSecurityProvider {
    name: String,
    report: Mutex<SecurityReport>,
    fail: Mutex<bool>,
}

impl MockSecurityProvider {
    pub fn new(report: SecurityReport) -> Self {
        Self {
            name: "mock-security".to_string(),
            report: Mutex::new(report),
            fail: Mutex::new(false),
        }
    }

    /// A fully clean report: mint disabled, locked LP, audited, low tax.
    pub fn clean() -> Self {
        Self::new(SecurityReport {
            mint_disabled: Some(true),
            lp_locked: Some(true),
            lp_lock_days: Some(365.0),
            buy_tax: Some(0.01),
            sell_tax: Some(0.01),
            audited: Some(true),
            major_issues: Some(0),
            critical_issues: Some(0),
            whale_holder_pct: Some(0.1),
            whale_count: Some(1),
            holder_count: Some(500),
            is_honeypot: Some(false),
        })
    }

    pub fn set_report(&self, report: SecurityReport) {
        *self.report.lock().unwrap() = report;
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl SecurityProvider for MockSecurityProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn security_report(&self, _address: &str) -> Result<SecurityReport, ProviderError> {
        if *self.fail.lock().unwrap() {
            return Err(ProviderError::Timeout(10));
        }
        Ok(self.report.lock().unwrap().clone())
    }

    async fn healthy(&self) -> bool {
        !*self.fail.lock().unwrap()
    }
}

/// Mock social provider with one canned stats payload.
pub struct MockSocialProvider {
    stats: Mutex<SocialStats>,
}

impl MockSocialProvider {
    pub fn new(stats: SocialStats) -> Self {
        Self {
            stats: Mutex::new(stats),
        }
    }

    pub fn quiet() -> Self {
        Self::new(SocialStats::default())
    }
}

#[async_trait]
impl SocialProvider for MockSocialProvider {
    fn name(&self) -> &str {
        "mock-social"
    }

    async fn social_stats(&self, _address: &str) -> Result<SocialStats, ProviderError> {
        Ok(self.stats.lock().unwrap().clone())
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    tokens: HashMap<String, Token>,
    snapshots: Vec<MarketSnapshot>,
    scores: Vec<CompositeScore>,
    alerts: Vec<Alert>,
}

/// In-memory [`TokenStore`] with full contract semantics.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.lock().unwrap().snapshots.len()
    }

    pub fn alert_count(&self) -> usize {
        self.inner.lock().unwrap().alerts.len()
    }

    pub fn token(&self, address: &str) -> Option<Token> {
        self.inner.lock().unwrap().tokens.get(address).cloned()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn upsert_token(&self, token: &Token) -> Result<(), PersistenceError> {
        self.inner
            .lock()
            .unwrap()
            .tokens
            .insert(token.address.clone(), token.clone());
        Ok(())
    }

    async fn append_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PersistenceError> {
        self.inner.lock().unwrap().snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn append_score(&self, score: &CompositeScore) -> Result<(), PersistenceError> {
        self.inner.lock().unwrap().scores.push(score.clone());
        Ok(())
    }

    async fn append_alert(&self, alert: &Alert) -> Result<(), PersistenceError> {
        self.inner.lock().unwrap().alerts.push(alert.clone());
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .rev()
            .find(|s| s.address == address)
            .cloned())
    }

    async fn previous_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .snapshots
            .iter()
            .rev()
            .filter(|s| s.address == address)
            .nth(1)
            .cloned())
    }

    async fn latest_score(
        &self,
        address: &str,
    ) -> Result<Option<CompositeScore>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .scores
            .iter()
            .rev()
            .find(|s| s.address == address)
            .cloned())
    }

    async fn previous_score(
        &self,
        address: &str,
    ) -> Result<Option<CompositeScore>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .scores
            .iter()
            .rev()
            .filter(|s| s.address == address)
            .nth(1)
            .cloned())
    }

    async fn exists_alert_since(
        &self,
        address: &str,
        kind: AlertKind,
        window: Duration,
    ) -> Result<bool, PersistenceError> {
        let cutoff = Utc::now() - window;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .any(|a| a.address == address && a.kind == kind && a.created_at >= cutoff))
    }

    async fn alerts_for(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Alert>, PersistenceError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .alerts
            .iter()
            .rev()
            .filter(|a| a.address == address)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn purge_alerts_older_than(&self, days: i64) -> Result<usize, PersistenceError> {
        let cutoff = Utc::now() - Duration::days(days);
        let mut inner = self.inner.lock().unwrap();
        let before = inner.alerts.len();
        inner.alerts.retain(|a| a.created_at >= cutoff);
        Ok(before - inner.alerts.len())
    }
}
