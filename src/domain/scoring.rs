//! Composite Scoring
//!
//! Combines the risk assessment into a safety composite and the trend
//! signals plus buy/sell pressure into a hype composite, then derives a
//! headline verdict and a confidence for the pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::risk::{RiskAssessment, RiskCheck};
use super::token::MarketSnapshot;
use super::trend::TrendSignals;

/// Headline verdict; first matching rule wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Avoid,
    Caution,
    Watch,
    Hot,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Avoid => "AVOID",
            Verdict::Caution => "CAUTION",
            Verdict::Watch => "WATCH",
            Verdict::Hot => "HOT",
        };
        f.write_str(s)
    }
}

/// Safety/hype composites and the resulting verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeScore {
    pub address: String,
    /// 0-100, weighted safety checks
    pub safety_composite: f64,
    /// 0-100, weighted momentum metrics
    pub hype_composite: f64,
    /// Mean of the two composites
    pub total: f64,
    pub verdict: Verdict,
    /// 0-1; balanced, high composites score highest
    pub confidence: f64,
    pub scored_at: DateTime<Utc>,
}

/// Verdict thresholds. Defaults follow the HOT/WATCH tiers:
/// HOT at safety ≥ 80, hype ≥ 70, combined ≥ 75;
/// WATCH at safety ≥ 60, hype ≥ 50, combined ≥ 55.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerdictThresholds {
    pub avoid_safety: f64,
    pub hot_safety: f64,
    pub hot_hype: f64,
    pub hot_combined: f64,
    pub watch_safety: f64,
    pub watch_hype: f64,
    pub watch_combined: f64,
}

impl Default for VerdictThresholds {
    fn default() -> Self {
        Self {
            avoid_safety: 30.0,
            hot_safety: 80.0,
            hot_hype: 70.0,
            hot_combined: 75.0,
            watch_safety: 60.0,
            watch_hype: 50.0,
            watch_combined: 55.0,
        }
    }
}

/// Safety-composite weights over the risk checks.
const SAFETY_WEIGHTS: [(RiskCheck, f64); 5] = [
    (RiskCheck::MintAuthority, 0.3),
    (RiskCheck::Liquidity, 0.3),
    (RiskCheck::ContractSecurity, 0.2),
    (RiskCheck::TaxRate, 0.1),
    (RiskCheck::HolderDistribution, 0.1),
];

/// Hype-composite weights: volume growth, holder growth, buy/sell ratio,
/// whale activity, social momentum.
const HYPE_WEIGHTS: HypeWeights = HypeWeights {
    volume_growth: 0.3,
    holder_growth: 0.2,
    buy_sell_ratio: 0.2,
    whale_activity: 0.2,
    social_momentum: 0.1,
};

struct HypeWeights {
    volume_growth: f64,
    holder_growth: f64,
    buy_sell_ratio: f64,
    whale_activity: f64,
    social_momentum: f64,
}

/// Combines risk and trend outputs into a [`CompositeScore`].
#[derive(Debug, Clone)]
pub struct Scorer {
    thresholds: VerdictThresholds,
}

impl Scorer {
    pub fn new(thresholds: VerdictThresholds) -> Self {
        Self { thresholds }
    }

    pub fn score(
        &self,
        assessment: &RiskAssessment,
        trend: &TrendSignals,
        snapshot: &MarketSnapshot,
    ) -> CompositeScore {
        let safety = Self::safety_composite(assessment);
        let hype = Self::hype_composite(trend, snapshot);
        let total = (safety + hype) / 2.0;

        CompositeScore {
            address: assessment.address.clone(),
            safety_composite: safety,
            hype_composite: hype,
            total,
            verdict: self.verdict(safety, hype, total),
            confidence: Self::confidence(safety, hype),
            scored_at: Utc::now(),
        }
    }

    /// Weighted combination of the safety-relevant risk checks, 0-100.
    pub fn safety_composite(assessment: &RiskAssessment) -> f64 {
        SAFETY_WEIGHTS
            .iter()
            .map(|(check, weight)| assessment.check_score(*check) * weight)
            .sum::<f64>()
            .clamp(0.0, 100.0)
    }

    /// Weighted combination of momentum metrics, 0-100. Trend signals scale
    /// by 100; the buy/sell ratio scales by 50 so a 2:1 buy pressure maxes
    /// the component.
    pub fn hype_composite(trend: &TrendSignals, snapshot: &MarketSnapshot) -> f64 {
        let volume_growth = (trend.volume * 100.0).min(100.0);
        let holder_growth = (trend.holders * 100.0).min(100.0);
        let buy_sell = (snapshot.buy_sell_ratio() * 50.0).min(100.0);
        let whale = (trend.whale * 100.0).min(100.0);
        let social = (trend.social * 100.0).min(100.0);

        let w = &HYPE_WEIGHTS;
        (volume_growth * w.volume_growth
            + holder_growth * w.holder_growth
            + buy_sell * w.buy_sell_ratio
            + whale * w.whale_activity
            + social * w.social_momentum)
            .clamp(0.0, 100.0)
    }

    fn verdict(&self, safety: f64, hype: f64, total: f64) -> Verdict {
        let t = &self.thresholds;
        if safety < t.avoid_safety {
            return Verdict::Avoid;
        }
        if safety >= t.hot_safety && hype >= t.hot_hype && total >= t.hot_combined {
            return Verdict::Hot;
        }
        if safety >= t.watch_safety && hype >= t.watch_hype && total >= t.watch_combined {
            return Verdict::Watch;
        }
        Verdict::Caution
    }

    /// Balanced composites carry more weight than high ones:
    /// 0.6·(1 − |safety−hype|/100) + 0.4·((safety+hype)/200).
    pub fn confidence(safety: f64, hype: f64) -> f64 {
        let balance = (1.0 - (safety - hype).abs() / 100.0).max(0.0);
        let level = (safety + hype) / 200.0;
        (balance * 0.6 + level * 0.4).min(1.0)
    }
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(VerdictThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::RiskScore;
    use approx::assert_relative_eq;
    use std::collections::BTreeMap;

    fn assessment_with(scores: &[(RiskCheck, f64)]) -> RiskAssessment {
        let map: BTreeMap<RiskCheck, RiskScore> = scores
            .iter()
            .map(|(c, s)| (*c, RiskScore::new(*s, 1.0)))
            .collect();
        RiskAssessment::from_scores("addr", map)
    }

    fn verdict_for(safety: f64, hype: f64) -> Verdict {
        let scorer = Scorer::default();
        scorer.verdict(safety, hype, (safety + hype) / 2.0)
    }

    #[test]
    fn test_verdict_avoid_at_low_safety() {
        assert_eq!(verdict_for(25.0, 0.0), Verdict::Avoid);
        assert_eq!(verdict_for(25.0, 100.0), Verdict::Avoid);
    }

    #[test]
    fn test_verdict_hot() {
        assert_eq!(verdict_for(85.0, 75.0), Verdict::Hot);
    }

    #[test]
    fn test_verdict_watch() {
        assert_eq!(verdict_for(65.0, 55.0), Verdict::Watch);
    }

    #[test]
    fn test_verdict_caution_fallthrough() {
        assert_eq!(verdict_for(40.0, 40.0), Verdict::Caution);
        // High hype cannot promote a mid-safety token past WATCH rules
        assert_eq!(verdict_for(50.0, 95.0), Verdict::Caution);
    }

    #[test]
    fn test_confidence_formula() {
        // Balanced mid scores: 0.6·1.0 + 0.4·0.5
        assert_relative_eq!(Scorer::confidence(50.0, 50.0), 0.8, epsilon = 1e-9);
        // Max imbalance: 0.6·0 + 0.4·0.5
        assert_relative_eq!(Scorer::confidence(100.0, 0.0), 0.2, epsilon = 1e-9);
        assert_relative_eq!(Scorer::confidence(100.0, 100.0), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_safety_composite_weights() {
        let assessment = assessment_with(&[
            (RiskCheck::MintAuthority, 100.0),
            (RiskCheck::Liquidity, 100.0),
            (RiskCheck::ContractSecurity, 50.0),
            (RiskCheck::TaxRate, 0.0),
            (RiskCheck::HolderDistribution, 0.0),
        ]);
        // 0.3·100 + 0.3·100 + 0.2·50 = 70
        assert_relative_eq!(Scorer::safety_composite(&assessment), 70.0, epsilon = 1e-9);
    }

    #[test]
    fn test_hype_composite_buy_pressure() {
        let mut snap = MarketSnapshot::empty("addr");
        snap.buy_count_24h = 200;
        snap.sell_count_24h = 100;
        snap.reported.trade_counts = true;

        let trend = TrendSignals {
            volume: 1.0,
            holders: 0.5,
            whale: 0.0,
            social: 0.0,
        };
        // 0.3·100 + 0.2·50 + 0.2·(2·50) = 60
        assert_relative_eq!(
            Scorer::hype_composite(&trend, &snap),
            60.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_score_end_to_end_shape() {
        let assessment = assessment_with(&[
            (RiskCheck::MintAuthority, 100.0),
            (RiskCheck::Liquidity, 100.0),
            (RiskCheck::ContractSecurity, 100.0),
            (RiskCheck::TaxRate, 100.0),
            (RiskCheck::HolderDistribution, 100.0),
        ]);
        let trend = TrendSignals {
            volume: 1.0,
            holders: 1.0,
            whale: 1.0,
            social: 1.0,
        };
        let mut snap = MarketSnapshot::empty("addr");
        snap.buy_count_24h = 300;
        snap.sell_count_24h = 100;

        let score = Scorer::default().score(&assessment, &trend, &snap);
        assert_eq!(score.verdict, Verdict::Hot);
        assert!(score.confidence > 0.9);
        assert!(score.total >= 75.0);
    }
}
