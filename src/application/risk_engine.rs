//! Risk Engine
//!
//! Runs the fixed set of weighted risk checks for a token. The three
//! upstream fetches (security report, social stats, merged snapshot) run
//! concurrently; a failed fetch fails only the checks that depend on it,
//! scoring them 0 with confidence 0. Assessments are cached per token with
//! a TTL, and concurrent callers for the same token join the in-flight
//! computation instead of duplicating work.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::risk::{RiskAssessment, RiskCheck, RiskScore};
use crate::domain::token::MarketSnapshot;
use crate::domain::ttl_cache::TtlCache;
use crate::ports::provider::{SecurityProvider, SecurityReport, SocialProvider, SocialStats};

use super::aggregator::MarketAggregator;

/// Confidence assigned when a provider answered but left the field out.
const UNREPORTED_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct RiskEngineConfig {
    pub cache_ttl: Duration,
    /// LP locks at or beyond this horizon earn the full liquidity score
    pub min_lp_lock_days: f64,
    /// Liquidity treated as fully sufficient for the volatility check
    pub min_liquidity_usd: f64,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            min_lp_lock_days: 30.0,
            min_liquidity_usd: 10_000.0,
        }
    }
}

pub struct RiskEngine {
    security: Arc<dyn SecurityProvider>,
    social: Arc<dyn SocialProvider>,
    aggregator: Arc<MarketAggregator>,
    config: RiskEngineConfig,
    cache: Mutex<TtlCache<String, Arc<RiskAssessment>>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RiskEngine {
    pub fn new(
        security: Arc<dyn SecurityProvider>,
        social: Arc<dyn SocialProvider>,
        aggregator: Arc<MarketAggregator>,
        config: RiskEngineConfig,
    ) -> Self {
        let cache_ttl = config.cache_ttl;
        Self {
            security,
            social,
            aggregator,
            config,
            cache: Mutex::new(TtlCache::new(cache_ttl)),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Assess a token, serving from cache when fresh. Concurrent callers
    /// for the same address serialize on a per-key lock; the first computes
    /// and the rest hit the cache it filled.
    pub async fn assess(&self, address: &str) -> Arc<RiskAssessment> {
        if let Some(hit) = self.cache.lock().await.get(&address.to_string()) {
            return hit;
        }

        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(address.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let _guard = key_lock.lock().await;

        // A joiner that waited on the lock finds the cache filled
        if let Some(hit) = self.cache.lock().await.get(&address.to_string()) {
            return hit;
        }

        debug!(%address, "Computing risk assessment");
        let assessment = Arc::new(self.compute(address).await);
        self.cache
            .lock()
            .await
            .insert(address.to_string(), Arc::clone(&assessment));
        self.inflight.lock().await.remove(address);

        assessment
    }

    async fn compute(&self, address: &str) -> RiskAssessment {
        let (security, social, snapshot) = tokio::join!(
            self.security.security_report(address),
            self.social.social_stats(address),
            self.aggregator.snapshot(address),
        );

        let mut scores: BTreeMap<RiskCheck, RiskScore> = BTreeMap::new();

        match &security {
            Ok(report) => {
                scores.insert(RiskCheck::MintAuthority, Self::check_mint(report));
                scores.insert(RiskCheck::Liquidity, self.check_liquidity_lock(report));
                scores.insert(RiskCheck::HolderDistribution, Self::check_holders(report));
                scores.insert(RiskCheck::TaxRate, Self::check_tax(report));
                scores.insert(RiskCheck::ContractSecurity, Self::check_audit(report));
            }
            Err(e) => {
                for check in [
                    RiskCheck::MintAuthority,
                    RiskCheck::Liquidity,
                    RiskCheck::HolderDistribution,
                    RiskCheck::TaxRate,
                    RiskCheck::ContractSecurity,
                ] {
                    scores.insert(check, RiskScore::failed(e));
                }
            }
        }

        if snapshot.is_empty() {
            scores.insert(RiskCheck::TradingVolume, RiskScore::failed("no market data"));
            scores.insert(RiskCheck::PriceVolatility, RiskScore::failed("no market data"));
        } else {
            scores.insert(RiskCheck::TradingVolume, Self::check_trading(&snapshot));
            scores.insert(
                RiskCheck::PriceVolatility,
                self.check_volatility(&snapshot),
            );
        }

        match &social {
            Ok(stats) => {
                scores.insert(RiskCheck::SocialSentiment, Self::check_sentiment(stats));
            }
            Err(e) => {
                scores.insert(RiskCheck::SocialSentiment, RiskScore::failed(e));
            }
        }

        RiskAssessment::from_scores(address, scores)
    }

    /// Mint authority: disabled is safe, enabled (or unknown) is not.
    fn check_mint(report: &SecurityReport) -> RiskScore {
        match report.mint_disabled {
            Some(true) => RiskScore::new(100.0, 1.0).with_detail("mint_disabled", true),
            Some(false) => RiskScore::new(0.0, 1.0).with_detail("mint_disabled", false),
            None => RiskScore::new(0.0, UNREPORTED_CONFIDENCE).with_detail("mint_disabled", "not reported"),
        }
    }

    /// Liquidity lock: full score at the configured lock horizon, pro-rata
    /// below it, zero when unlocked.
    fn check_liquidity_lock(&self, report: &SecurityReport) -> RiskScore {
        let min_days = self.config.min_lp_lock_days;
        match (report.lp_locked, report.lp_lock_days) {
            (Some(true), Some(days)) if days >= min_days => {
                RiskScore::new(100.0, 1.0).with_detail("lock_days", days)
            }
            (Some(true), Some(days)) if days > 0.0 => {
                RiskScore::new(days / min_days * 100.0, 1.0)
                    .with_detail("lock_days", days)
                    .with_detail("risk", "short_lp_lock")
            }
            (Some(true), _) => RiskScore::new(50.0, 0.8).with_detail("lock_days", "unknown"),
            (Some(false), _) => RiskScore::new(0.0, 1.0).with_detail("risk", "no_lp_lock"),
            (None, _) => RiskScore::new(0.0, UNREPORTED_CONFIDENCE).with_detail("lp_locked", "not reported"),
        }
    }

    /// Holder concentration: 50% of supply in whale wallets scores 0.
    fn check_holders(report: &SecurityReport) -> RiskScore {
        match report.whale_holder_pct {
            Some(whale_pct) => {
                let score = (100.0 - whale_pct * 200.0).max(0.0);
                let mut result = RiskScore::new(score, 1.0).with_detail("whale_total", whale_pct);
                if let Some(count) = report.whale_count {
                    if count > 5 {
                        result = result.with_detail("risk", "high_whale_count");
                    }
                }
                result
            }
            None => RiskScore::new(0.0, UNREPORTED_CONFIDENCE).with_detail("whale_total", "not reported"),
        }
    }

    /// Tax: 25% or higher on either side scores 0.
    fn check_tax(report: &SecurityReport) -> RiskScore {
        match (report.buy_tax, report.sell_tax) {
            (Some(buy), Some(sell)) => {
                let max_tax = buy.max(sell);
                RiskScore::new((100.0 - max_tax * 400.0).max(0.0), 1.0)
                    .with_detail("buy_tax", buy)
                    .with_detail("sell_tax", sell)
            }
            _ => RiskScore::new(0.0, UNREPORTED_CONFIDENCE).with_detail("taxes", "not reported"),
        }
    }

    /// Audit: 80 base for an audit, +20 with no major issues, +10 with no
    /// critical ones.
    fn check_audit(report: &SecurityReport) -> RiskScore {
        match report.audited {
            Some(true) => {
                let mut score = 80.0;
                if report.major_issues == Some(0) {
                    score += 20.0;
                } else if report.critical_issues == Some(0) {
                    score += 10.0;
                }
                RiskScore::new(score, 1.0)
                    .with_detail("has_audit", true)
                    .with_detail("major_issues", report.major_issues.unwrap_or(0))
            }
            Some(false) => RiskScore::new(0.0, 1.0).with_detail("has_audit", false),
            None => RiskScore::new(0.0, UNREPORTED_CONFIDENCE).with_detail("has_audit", "not reported"),
        }
    }

    /// Trading health: volume/liquidity ratio, liquidity depth and price
    /// stability, weighted 0.4/0.4/0.2.
    fn check_trading(snapshot: &MarketSnapshot) -> RiskScore {
        let volume_score = if snapshot.volume_24h > 0.0 && snapshot.liquidity > 0.0 {
            ((snapshot.volume_24h / snapshot.liquidity) * 100.0).min(100.0)
        } else {
            0.0
        };
        let liquidity_score = ((snapshot.liquidity / 10_000.0) * 100.0).min(100.0);
        let volatility_score = (100.0 - snapshot.price_change_24h.abs()).max(0.0);

        let total = volume_score * 0.4 + liquidity_score * 0.4 + volatility_score * 0.2;
        RiskScore::new(total, 0.9)
            .with_detail("volume_score", volume_score)
            .with_detail("liquidity_score", liquidity_score)
            .with_detail("volatility_score", volatility_score)
    }

    /// Price stability tiers with liquidity-aware confidence.
    fn check_volatility(&self, snapshot: &MarketSnapshot) -> RiskScore {
        let change = snapshot.price_change_24h.abs();
        let stability_score = if change <= 5.0 {
            100.0
        } else if change <= 10.0 {
            75.0
        } else if change <= 20.0 {
            50.0
        } else if change <= 30.0 {
            25.0
        } else {
            0.0
        };

        let min_liquidity = self.config.min_liquidity_usd;
        let liquidity_score = if snapshot.liquidity >= min_liquidity {
            100.0
        } else {
            ((snapshot.liquidity / min_liquidity) * 100.0).min(99.0)
        };

        let volume_score = if snapshot.volume_24h > 0.0 && snapshot.liquidity > 0.0 {
            ((snapshot.volume_24h / snapshot.liquidity) * 100.0).min(100.0)
        } else {
            0.0
        };

        let total = stability_score * 0.4 + liquidity_score * 0.4 + volume_score * 0.2;
        let confidence = if snapshot.liquidity >= min_liquidity {
            0.9
        } else {
            0.7
        };
        RiskScore::new(total, confidence)
            .with_detail("stability_score", stability_score)
            .with_detail("price_change_24h", snapshot.price_change_24h)
    }

    /// Social sentiment ratio; neutral 50 with no mentions at all.
    fn check_sentiment(stats: &SocialStats) -> RiskScore {
        match stats.sentiment_ratio() {
            Some(ratio) => RiskScore::new(ratio * 100.0, 1.0)
                .with_detail("positive_mentions", stats.positive_mentions)
                .with_detail("negative_mentions", stats.negative_mentions),
            None => RiskScore::new(50.0, 1.0).with_detail("mentions", 0),
        }
    }

    /// Drop a token's cached assessment (used when a gate wants fresh data).
    pub async fn invalidate(&self, address: &str) {
        self.cache.lock().await.remove(&address.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::{MockMarketProvider, MockSecurityProvider, MockSocialProvider};
    use crate::ports::provider::{MarketFields, SocialStats};

    const ADDR: &str = "TokenAddr111111111111111111111111111111111";

    fn engine_with(security: MockSecurityProvider) -> RiskEngine {
        let market = Arc::new(MockMarketProvider::new("mock").with_fields(
            ADDR,
            MarketFields {
                price: Some(1.0),
                liquidity: Some(60_000.0),
                volume_24h: Some(30_000.0),
                holder_count: Some(500),
                price_change_24h: Some(4.0),
                ..Default::default()
            },
        ));
        RiskEngine::new(
            Arc::new(security),
            Arc::new(MockSocialProvider::new(SocialStats {
                positive_mentions: 8,
                negative_mentions: 2,
                ..Default::default()
            })),
            Arc::new(MarketAggregator::new(vec![market])),
            RiskEngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_clean_token_scores_high() {
        let engine = engine_with(MockSecurityProvider::clean());
        let assessment = engine.assess(ADDR).await;

        assert!(assessment.overall_score > 60.0, "got {}", assessment.overall_score);
        assert_eq!(assessment.check_score(RiskCheck::MintAuthority), 100.0);
        assert_eq!(assessment.check_score(RiskCheck::ContractSecurity), 100.0);
        assert!(assessment.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_scores_bounded_with_failing_security() {
        let security = MockSecurityProvider::clean();
        security.set_failing(true);
        let engine = engine_with(security);

        let assessment = engine.assess(ADDR).await;
        assert!(assessment.overall_score >= 0.0 && assessment.overall_score <= 100.0);
        for score in assessment.scores.values() {
            assert!((0.0..=100.0).contains(&score.score));
            assert!((0.0..=1.0).contains(&score.confidence));
        }
        // All five security-backed checks failed with zero confidence
        assert_eq!(assessment.check_score(RiskCheck::MintAuthority), 0.0);
        assert_eq!(
            assessment.scores[&RiskCheck::MintAuthority].confidence,
            0.0
        );
    }

    #[tokio::test]
    async fn test_assessment_is_cached() {
        let engine = engine_with(MockSecurityProvider::clean());
        let first = engine.assess(ADDR).await;
        let second = engine.assess(ADDR).await;
        // Same Arc means the cache served the second call
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let engine = Arc::new(engine_with(MockSecurityProvider::clean()));
        let (a, b) = tokio::join!(
            {
                let e = Arc::clone(&engine);
                async move { e.assess(ADDR).await }
            },
            {
                let e = Arc::clone(&engine);
                async move { e.assess(ADDR).await }
            }
        );
        assert_eq!(a.overall_score, b.overall_score);
    }

    #[tokio::test]
    async fn test_invalidate_forces_recompute() {
        let engine = engine_with(MockSecurityProvider::clean());
        let first = engine.assess(ADDR).await;
        engine.invalidate(ADDR).await;
        let second = engine.assess(ADDR).await;
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_tax_formula() {
        let mut report = SecurityReport::default();
        report.buy_tax = Some(0.05);
        report.sell_tax = Some(0.25);
        // 25% tax zeroes the score
        assert_eq!(RiskEngine::check_tax(&report).score, 0.0);

        report.sell_tax = Some(0.10);
        // 10% → 100 - 40 = 60
        assert_eq!(RiskEngine::check_tax(&report).score, 60.0);
    }

    #[test]
    fn test_holder_concentration_formula() {
        let mut report = SecurityReport::default();
        report.whale_holder_pct = Some(0.5);
        assert_eq!(RiskEngine::check_holders(&report).score, 0.0);

        report.whale_holder_pct = Some(0.2);
        assert_eq!(RiskEngine::check_holders(&report).score, 60.0);
    }

    #[test]
    fn test_audit_tiers() {
        let mut report = SecurityReport::default();
        report.audited = Some(true);
        report.major_issues = Some(0);
        report.critical_issues = Some(0);
        assert_eq!(RiskEngine::check_audit(&report).score, 100.0);

        report.major_issues = Some(2);
        assert_eq!(RiskEngine::check_audit(&report).score, 90.0);

        report.critical_issues = Some(1);
        assert_eq!(RiskEngine::check_audit(&report).score, 80.0);

        report.audited = Some(false);
        assert_eq!(RiskEngine::check_audit(&report).score, 0.0);
    }

    #[test]
    fn test_sentiment_neutral_without_mentions() {
        let score = RiskEngine::check_sentiment(&SocialStats::default());
        assert_eq!(score.score, 50.0);
        assert_eq!(score.confidence, 1.0);
    }
}
