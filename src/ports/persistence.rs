//! Persistence Port
//!
//! Append-only store contract consumed by the pipeline. Snapshots, scores
//! and alerts are append-only records; writes are all-or-nothing per record.
//! The alert existence check is the dedup/cooldown primitive: the engine
//! asks the store whether a (token, kind) alert exists inside the window
//! before inserting.

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

use crate::domain::alert::{Alert, AlertKind};
use crate::domain::scoring::CompositeScore;
use crate::domain::token::{MarketSnapshot, Token};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Storage I/O error: {0}")]
    Io(String),

    #[error("Record serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

/// Store contract for tokens, snapshots, scores and alerts.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Insert or refresh a token identity record.
    async fn upsert_token(&self, token: &Token) -> Result<(), PersistenceError>;

    async fn append_snapshot(&self, snapshot: &MarketSnapshot) -> Result<(), PersistenceError>;

    async fn append_score(&self, score: &CompositeScore) -> Result<(), PersistenceError>;

    async fn append_alert(&self, alert: &Alert) -> Result<(), PersistenceError>;

    /// Most recent snapshot for a token.
    async fn latest_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError>;

    /// Second-most-recent snapshot (the previous cycle's capture).
    async fn previous_snapshot(
        &self,
        address: &str,
    ) -> Result<Option<MarketSnapshot>, PersistenceError>;

    async fn latest_score(&self, address: &str)
        -> Result<Option<CompositeScore>, PersistenceError>;

    async fn previous_score(
        &self,
        address: &str,
    ) -> Result<Option<CompositeScore>, PersistenceError>;

    /// Whether an alert of this kind exists for the token inside the window.
    async fn exists_alert_since(
        &self,
        address: &str,
        kind: AlertKind,
        window: Duration,
    ) -> Result<bool, PersistenceError>;

    /// Recent alerts for a token, newest first.
    async fn alerts_for(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<Alert>, PersistenceError>;

    /// Drop alerts older than the given number of days; returns how many.
    async fn purge_alerts_older_than(&self, days: i64) -> Result<usize, PersistenceError>;
}
