//! Trend Engine
//!
//! Normalized growth/momentum signals computed from the current snapshot
//! relative to the prior one. Each signal lands in [0, 1]: growth rate over
//! the configured threshold, clamped, with an absolute floor below which the
//! signal is forced to 0 and a small fixed cold-start score when no history
//! exists.

use serde::{Deserialize, Serialize};

/// Score assigned when the current value clears the floor but there is no
/// prior-period data to compare against. Distinguishes "no history" from
/// "measured decline".
pub const COLD_START_SCORE: f64 = 0.1;

/// Thresholds governing trend normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendThresholds {
    /// Volume growth rate treated as maximal momentum (2.0 = +200%)
    pub volume_growth: f64,
    /// Minimum 24h volume in USD for a valid volume signal
    pub volume_floor: f64,
    /// Holder growth rate treated as maximal momentum
    pub holder_growth: f64,
    /// Minimum holder count for a valid holder signal
    pub holder_floor: u64,
    /// Whale volume share of 24h volume treated as maximal activity
    pub whale_impact: f64,
    /// Minimum number of mentions for a valid social signal
    pub social_mentions: usize,
    /// Sentiment below this contributes nothing to the social signal
    pub social_sentiment: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            volume_growth: 2.0,
            volume_floor: 5_000.0,
            holder_growth: 0.2,
            holder_floor: 100,
            whale_impact: 0.05,
            social_mentions: 5,
            social_sentiment: 0.6,
        }
    }
}

/// Per-dimension momentum signals, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrendSignals {
    pub volume: f64,
    pub holders: f64,
    pub whale: f64,
    pub social: f64,
}

/// Computes normalized momentum signals from snapshot pairs.
#[derive(Debug, Clone)]
pub struct TrendEngine {
    thresholds: TrendThresholds,
}

impl TrendEngine {
    pub fn new(thresholds: TrendThresholds) -> Self {
        Self { thresholds }
    }

    /// Non-negative growth rate of `current` over `previous`.
    fn growth_rate(previous: f64, current: f64) -> f64 {
        if previous <= 0.0 {
            return if current > 0.0 { 1.0 } else { 0.0 };
        }
        ((current - previous) / previous).max(0.0)
    }

    /// Volume momentum. Below the volume floor the signal is 0 regardless of
    /// growth; missing history yields the cold-start score.
    pub fn volume_score(&self, current: f64, previous: Option<f64>) -> f64 {
        if current < self.thresholds.volume_floor {
            return 0.0;
        }
        let Some(previous) = previous else {
            return COLD_START_SCORE;
        };
        (Self::growth_rate(previous, current) / self.thresholds.volume_growth).clamp(0.0, 1.0)
    }

    /// Holder momentum, same floor/cold-start shape as volume.
    pub fn holder_score(&self, current: u64, previous: Option<u64>) -> f64 {
        if current < self.thresholds.holder_floor {
            return 0.0;
        }
        let Some(previous) = previous else {
            return COLD_START_SCORE;
        };
        (Self::growth_rate(previous as f64, current as f64) / self.thresholds.holder_growth)
            .clamp(0.0, 1.0)
    }

    /// Whale activity: share of 24h volume carried by whale-sized
    /// transactions, normalized by the impact threshold.
    pub fn whale_score(&self, whale_volume: f64, total_volume: f64) -> f64 {
        if whale_volume <= 0.0 || total_volume <= 0.0 {
            return 0.0;
        }
        ((whale_volume / total_volume) / self.thresholds.whale_impact).clamp(0.0, 1.0)
    }

    /// Social momentum: 60% mention count, 40% sentiment. Sentiment below
    /// the gate contributes nothing.
    pub fn social_score(&self, mention_count: usize, sentiment: f64) -> f64 {
        if mention_count < self.thresholds.social_mentions {
            return 0.0;
        }
        let mention_score =
            (mention_count as f64 / (self.thresholds.social_mentions as f64 * 2.0)).min(1.0);
        let sentiment_score = if sentiment > self.thresholds.social_sentiment {
            sentiment
        } else {
            0.0
        };
        (mention_score * 0.6 + sentiment_score * 0.4).clamp(0.0, 1.0)
    }
}

impl Default for TrendEngine {
    fn default() -> Self {
        Self::new(TrendThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine() -> TrendEngine {
        TrendEngine::default()
    }

    #[test]
    fn test_volume_below_floor_is_zero() {
        // Huge growth but below the $5k floor
        assert_relative_eq!(engine().volume_score(4_999.0, Some(10.0)), 0.0);
    }

    #[test]
    fn test_volume_cold_start() {
        assert_relative_eq!(engine().volume_score(10_000.0, None), COLD_START_SCORE);
    }

    #[test]
    fn test_volume_growth_normalized() {
        // +100% growth against a 200% threshold → 0.5
        assert_relative_eq!(engine().volume_score(20_000.0, Some(10_000.0)), 0.5);
        // +400% clamps to 1.0
        assert_relative_eq!(engine().volume_score(50_000.0, Some(10_000.0)), 1.0);
    }

    #[test]
    fn test_volume_decline_is_zero_not_negative() {
        assert_relative_eq!(engine().volume_score(10_000.0, Some(20_000.0)), 0.0);
    }

    #[test]
    fn test_holder_growth() {
        // +10% against a 20% threshold → 0.5
        assert_relative_eq!(engine().holder_score(110, Some(100)), 0.5, epsilon = 1e-9);
        assert_relative_eq!(engine().holder_score(99, Some(50)), 0.0); // below floor
        assert_relative_eq!(engine().holder_score(150, None), COLD_START_SCORE);
    }

    #[test]
    fn test_whale_score() {
        // 2.5% of volume against a 5% threshold → 0.5
        assert_relative_eq!(engine().whale_score(2_500.0, 100_000.0), 0.5);
        assert_relative_eq!(engine().whale_score(10_000.0, 100_000.0), 1.0);
        assert_relative_eq!(engine().whale_score(0.0, 100_000.0), 0.0);
        assert_relative_eq!(engine().whale_score(500.0, 0.0), 0.0);
    }

    #[test]
    fn test_social_score_gates() {
        // Too few mentions
        assert_relative_eq!(engine().social_score(4, 0.9), 0.0);
        // Sentiment below gate contributes only the mention share
        assert_relative_eq!(engine().social_score(10, 0.5), 0.6);
        // Full mentions + strong sentiment
        assert_relative_eq!(engine().social_score(10, 0.9), 0.6 + 0.4 * 0.9);
    }

    #[test]
    fn test_signals_all_in_unit_range() {
        let e = engine();
        for (cur, prev) in [(1e9, Some(1.0)), (5_000.0, Some(5_000.0)), (0.0, None)] {
            let s = e.volume_score(cur, prev);
            assert!((0.0..=1.0).contains(&s), "volume score {s} out of range");
        }
    }
}
