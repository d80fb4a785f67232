//! Risk Assessment Types
//!
//! Per-check risk scores and the composite assessment produced by the risk
//! engine. Checks are weighted; a check that fails to produce data scores 0
//! with confidence 0 so it drags the composite down without aborting the
//! assessment.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of independent risk checks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum RiskCheck {
    MintAuthority,
    Liquidity,
    HolderDistribution,
    TaxRate,
    ContractSecurity,
    TradingVolume,
    PriceVolatility,
    SocialSentiment,
}

impl RiskCheck {
    /// All checks, in weight order.
    pub const ALL: [RiskCheck; 8] = [
        RiskCheck::MintAuthority,
        RiskCheck::Liquidity,
        RiskCheck::HolderDistribution,
        RiskCheck::TaxRate,
        RiskCheck::ContractSecurity,
        RiskCheck::TradingVolume,
        RiskCheck::PriceVolatility,
        RiskCheck::SocialSentiment,
    ];

    /// Fixed composite weight for this check.
    pub fn weight(&self) -> f64 {
        match self {
            RiskCheck::MintAuthority => 0.20,
            RiskCheck::Liquidity => 0.20,
            RiskCheck::HolderDistribution => 0.15,
            RiskCheck::TaxRate => 0.10,
            RiskCheck::ContractSecurity => 0.15,
            RiskCheck::TradingVolume => 0.10,
            RiskCheck::PriceVolatility => 0.05,
            RiskCheck::SocialSentiment => 0.05,
        }
    }

    /// Warning emitted when this check scores below [`LOW_SCORE_THRESHOLD`].
    pub fn warning(&self) -> &'static str {
        match self {
            RiskCheck::MintAuthority => "Mint authority is not disabled",
            RiskCheck::Liquidity => "Low or unlocked liquidity - high risk of price manipulation",
            RiskCheck::HolderDistribution => "Concentrated holder distribution - risk of dumps",
            RiskCheck::TaxRate => "High tax rates may impact trading",
            RiskCheck::ContractSecurity => "Contract security issues detected",
            RiskCheck::TradingVolume => "Thin or unhealthy trading volume",
            RiskCheck::PriceVolatility => "High price volatility",
            RiskCheck::SocialSentiment => "Negative social sentiment",
        }
    }

    /// Recommendation emitted alongside the warning.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskCheck::MintAuthority => "Wait for mint authority to be disabled",
            RiskCheck::Liquidity => "Wait for more liquidity to be added or locked",
            RiskCheck::HolderDistribution => "Monitor whale wallet movements",
            RiskCheck::TaxRate => "Consider tax impact on trades",
            RiskCheck::ContractSecurity => "Review contract security audit",
            RiskCheck::TradingVolume => "Wait for sustained trading activity",
            RiskCheck::PriceVolatility => "Wait for price action to stabilize",
            RiskCheck::SocialSentiment => "Watch community channels for sentiment shifts",
        }
    }
}

/// A check scoring below this emits its warning and recommendation.
pub const LOW_SCORE_THRESHOLD: f64 = 50.0;

/// Result of a single risk check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// 0-100, higher is safer
    pub score: f64,
    /// 0-1, how much data backed the score
    pub confidence: f64,
    /// Free-form detail for operator inspection
    pub details: BTreeMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl RiskScore {
    pub fn new(score: f64, confidence: f64) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 1.0),
            details: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Score recorded when a check errored out entirely.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self::new(0.0, 0.0).with_detail("error", error.to_string())
    }
}

/// Complete risk assessment for a token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub address: String,
    /// Confidence-weighted composite, 0-100
    pub overall_score: f64,
    pub scores: BTreeMap<RiskCheck, RiskScore>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub assessed_at: DateTime<Utc>,
}

impl RiskAssessment {
    /// Build an assessment from per-check scores, computing the weighted
    /// composite and the deterministic warning/recommendation lists.
    pub fn from_scores(address: impl Into<String>, scores: BTreeMap<RiskCheck, RiskScore>) -> Self {
        let weight_sum: f64 = RiskCheck::ALL.iter().map(|c| c.weight()).sum();
        let overall_score = RiskCheck::ALL
            .iter()
            .filter_map(|check| {
                scores
                    .get(check)
                    .map(|s| s.score * s.confidence * check.weight())
            })
            .sum::<f64>()
            / weight_sum;

        let mut warnings = Vec::new();
        let mut recommendations = Vec::new();
        for check in RiskCheck::ALL {
            if let Some(score) = scores.get(&check) {
                if score.score < LOW_SCORE_THRESHOLD {
                    warnings.push(check.warning().to_string());
                    recommendations.push(check.recommendation().to_string());
                }
            }
        }

        Self {
            address: address.into(),
            overall_score: overall_score.clamp(0.0, 100.0),
            scores,
            warnings,
            recommendations,
            assessed_at: Utc::now(),
        }
    }

    /// Mean per-check confidence, for the broadcast payload.
    pub fn data_confidence(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.values().map(|s| s.confidence).sum::<f64>() / self.scores.len() as f64
    }

    /// Score for one check; 0 when the check is absent.
    pub fn check_score(&self, check: RiskCheck) -> f64 {
        self.scores.get(&check).map(|s| s.score).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn all_scores(score: f64, confidence: f64) -> BTreeMap<RiskCheck, RiskScore> {
        RiskCheck::ALL
            .iter()
            .map(|c| (*c, RiskScore::new(score, confidence)))
            .collect()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = RiskCheck::ALL.iter().map(|c| c.weight()).sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overall_score_full_confidence() {
        let assessment = RiskAssessment::from_scores("addr", all_scores(80.0, 1.0));
        assert_relative_eq!(assessment.overall_score, 80.0, epsilon = 1e-9);
    }

    #[test]
    fn test_overall_score_degrades_with_confidence() {
        let assessment = RiskAssessment::from_scores("addr", all_scores(80.0, 0.5));
        assert_relative_eq!(assessment.overall_score, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_failed_checks_do_not_break_bounds() {
        let mut scores = all_scores(100.0, 1.0);
        scores.insert(RiskCheck::Liquidity, RiskScore::failed("timeout"));
        scores.insert(RiskCheck::TaxRate, RiskScore::failed("decode"));

        let assessment = RiskAssessment::from_scores("addr", scores);
        assert!(assessment.overall_score >= 0.0 && assessment.overall_score <= 100.0);
        assert!(assessment.overall_score < 100.0);
    }

    #[test]
    fn test_score_clamping() {
        let s = RiskScore::new(150.0, 2.0);
        assert_relative_eq!(s.score, 100.0);
        assert_relative_eq!(s.confidence, 1.0);

        let s = RiskScore::new(-5.0, -0.5);
        assert_relative_eq!(s.score, 0.0);
        assert_relative_eq!(s.confidence, 0.0);
    }

    #[test]
    fn test_low_scores_emit_fixed_warnings() {
        let mut scores = all_scores(90.0, 1.0);
        scores.insert(RiskCheck::MintAuthority, RiskScore::new(0.0, 1.0));
        scores.insert(RiskCheck::TaxRate, RiskScore::new(40.0, 1.0));

        let assessment = RiskAssessment::from_scores("addr", scores);
        assert_eq!(assessment.warnings.len(), 2);
        assert_eq!(assessment.recommendations.len(), 2);
        assert!(assessment
            .warnings
            .contains(&"Mint authority is not disabled".to_string()));
        assert!(assessment
            .recommendations
            .contains(&"Consider tax impact on trades".to_string()));
    }

    #[test]
    fn test_data_confidence_mean() {
        let mut scores = all_scores(50.0, 1.0);
        for check in [RiskCheck::SocialSentiment, RiskCheck::PriceVolatility] {
            scores.insert(check, RiskScore::new(50.0, 0.0));
        }
        let assessment = RiskAssessment::from_scores("addr", scores);
        assert_relative_eq!(assessment.data_confidence(), 0.75, epsilon = 1e-9);
    }
}
