//! Alert Types
//!
//! Alerts produced by the alert engine, their kinds and priorities, and the
//! aggregate risk verdict derived from the highest-priority active alert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What triggered the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    Price,
    Volume,
    Holders,
    Security,
    Whale,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AlertKind::Price => "price",
            AlertKind::Volume => "volume",
            AlertKind::Holders => "holders",
            AlertKind::Security => "security",
            AlertKind::Whale => "whale",
        };
        f.write_str(s)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum AlertPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// One alert for one token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub address: String,
    pub kind: AlertKind,
    pub priority: AlertPriority,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
}

impl Alert {
    pub fn new(
        address: impl Into<String>,
        kind: AlertKind,
        priority: AlertPriority,
        message: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            kind,
            priority,
            message: message.into(),
            created_at: Utc::now(),
            delivered: false,
        }
    }
}

/// Aggregate verdict over a set of current alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskVerdict {
    Clear,
    LowRisk,
    MediumRisk,
    HighRisk,
}

impl RiskVerdict {
    /// Derive the verdict from the highest-priority alert present.
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        let Some(max) = alerts.iter().map(|a| a.priority).max() else {
            return RiskVerdict::Clear;
        };
        match max {
            AlertPriority::High | AlertPriority::Critical => RiskVerdict::HighRisk,
            AlertPriority::Medium => RiskVerdict::MediumRisk,
            AlertPriority::Low => RiskVerdict::LowRisk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(priority: AlertPriority) -> Alert {
        Alert::new("addr", AlertKind::Price, priority, "test")
    }

    #[test]
    fn test_verdict_clear_when_no_alerts() {
        assert_eq!(RiskVerdict::from_alerts(&[]), RiskVerdict::Clear);
    }

    #[test]
    fn test_verdict_takes_highest_priority() {
        let alerts = vec![
            alert(AlertPriority::Low),
            alert(AlertPriority::High),
            alert(AlertPriority::Medium),
        ];
        assert_eq!(RiskVerdict::from_alerts(&alerts), RiskVerdict::HighRisk);
    }

    #[test]
    fn test_verdict_medium() {
        let alerts = vec![alert(AlertPriority::Low), alert(AlertPriority::Medium)];
        assert_eq!(RiskVerdict::from_alerts(&alerts), RiskVerdict::MediumRisk);
    }

    #[test]
    fn test_verdict_critical_maps_to_high_risk() {
        let alerts = vec![alert(AlertPriority::Critical)];
        assert_eq!(RiskVerdict::from_alerts(&alerts), RiskVerdict::HighRisk);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(AlertPriority::Critical > AlertPriority::High);
        assert!(AlertPriority::High > AlertPriority::Medium);
        assert!(AlertPriority::Medium > AlertPriority::Low);
    }
}
