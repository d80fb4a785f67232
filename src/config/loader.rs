//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Bad values (out-of-range intervals, invalid filter patterns,
//! zero thresholds) are rejected here and never reach the runtime loops.
//! Provider API keys come from the environment, not the config file.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::adapters::providers::{FetchClientConfig, RetryPolicy};
use crate::application::alert_engine::AlertThresholds;
use crate::application::orchestrator::{GateConfig, MonitorConfig};
use crate::domain::mention::MonitoredSource;
use crate::domain::scoring::VerdictThresholds;
use crate::domain::trend::TrendThresholds;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub gate: GateSection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub trend: TrendThresholds,
    #[serde(default)]
    pub alerts: AlertThresholds,
    #[serde(default)]
    pub scoring: ScoringSection,
    #[serde(default)]
    pub storage: StorageSection,
    pub providers: ProvidersSection,
    #[serde(default)]
    pub scanner: ScannerSection,
    #[serde(default)]
    pub sources: Vec<SourceSection>,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Refresh-loop configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Seconds between refresh ticks
    pub tick_interval_secs: u64,
    /// Maximum concurrent per-token refreshes per tick
    pub max_concurrent_refreshes: usize,
    /// Price move (%) between cycles that counts as significant
    pub significant_price_pct: f64,
    /// Volume move (%) between cycles that counts as significant
    pub significant_volume_pct: f64,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            max_concurrent_refreshes: 8,
            significant_price_pct: 5.0,
            significant_volume_pct: 20.0,
        }
    }
}

/// Validation-gate parameters for newly discovered tokens
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateSection {
    pub min_liquidity_usd: f64,
    pub min_holders: u64,
    /// Maximum whale/owner share of supply, as a fraction
    pub max_owner_concentration: f64,
}

impl Default for GateSection {
    fn default() -> Self {
        Self {
            min_liquidity_usd: 1_000.0,
            min_holders: 50,
            max_owner_concentration: 0.5,
        }
    }
}

/// Risk engine configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    /// Seconds a risk assessment stays cached
    pub cache_ttl_secs: u64,
    /// LP lock horizon earning the full liquidity score
    pub min_lp_lock_days: f64,
    /// Liquidity treated as fully sufficient by the volatility check
    pub min_liquidity_usd: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            min_lp_lock_days: 30.0,
            min_liquidity_usd: 10_000.0,
        }
    }
}

/// Verdict thresholds (optional overrides)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub verdict: Option<VerdictThresholds>,
}

/// Storage configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Directory for the JSONL store
    pub data_dir: String,
    /// Alerts older than this many days are purged
    pub alert_retention_days: i64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            alert_retention_days: 30,
        }
    }
}

/// One provider client section
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSection {
    pub base_url: String,
    #[serde(default = "default_rate_limit_calls")]
    pub rate_limit_calls: usize,
    #[serde(default = "default_rate_limit_period")]
    pub rate_limit_period_secs: u64,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub probe_path: Option<String>,
    /// Environment variable holding the API key, if the provider needs one
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Header the key is sent in
    #[serde(default)]
    pub api_key_header: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryPolicy>,
}

fn default_rate_limit_calls() -> usize {
    100
}
fn default_rate_limit_period() -> u64 {
    60
}
fn default_cache_ttl() -> u64 {
    300
}
fn default_timeout() -> u64 {
    10
}

impl ProviderSection {
    /// Build the fetch-client configuration, resolving the API key from the
    /// environment.
    pub fn client_config(&self, name: &str) -> FetchClientConfig {
        let mut config = FetchClientConfig::new(name, &self.base_url);
        config.rate_limit_calls = self.rate_limit_calls;
        config.rate_limit_period_secs = self.rate_limit_period_secs;
        config.cache_ttl_secs = self.cache_ttl_secs;
        config.timeout_secs = self.timeout_secs;
        if let Some(path) = &self.probe_path {
            config.probe_path = path.clone();
        }
        if let Some(retry) = &self.retry {
            config.retry = retry.clone();
        }
        if let (Some(env), Some(header)) = (&self.api_key_env, &self.api_key_header) {
            config.api_key = std::env::var(env).ok();
            config.api_key_header = Some(header.clone());
        }
        config
    }
}

/// Provider clients configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersSection {
    pub dexscreener: ProviderSection,
    pub birdeye: ProviderSection,
    pub rugcheck: ProviderSection,
}

/// Scanner service configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScannerSection {
    /// Mention queue capacity
    pub queue_capacity: usize,
    /// Chat relay export API base URL
    pub chat_relay_url: String,
    /// Code-hosting API base URL
    pub repository_api_url: String,
    /// Social-data API base URL
    pub social_api_url: String,
}

impl Default for ScannerSection {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            chat_relay_url: "http://localhost:8081".to_string(),
            repository_api_url: "https://api.github.com".to_string(),
            social_api_url: "http://localhost:8082".to_string(),
        }
    }
}

/// One discovery source
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSection {
    /// chat, feed, repository or social
    pub kind: String,
    /// Group id, feed URL, repo slug or account handle
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_scan_interval() -> u64 {
    60
}

impl SourceSection {
    pub fn to_source(&self) -> MonitoredSource {
        let mut source = MonitoredSource::new(self.kind.clone().into(), self.identifier.clone());
        source.name = self.name.clone();
        source.scan_interval_secs = self.scan_interval_secs;
        source.keywords = self.keywords.clone();
        source.patterns = self.patterns.clone();
        source
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.monitor.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "tick_interval_secs must be > 0".to_string(),
            ));
        }
        if self.monitor.max_concurrent_refreshes == 0 {
            return Err(ConfigError::ValidationError(
                "max_concurrent_refreshes must be > 0".to_string(),
            ));
        }
        if self.gate.min_liquidity_usd < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "min_liquidity_usd must be >= 0, got {}",
                self.gate.min_liquidity_usd
            )));
        }
        if !(0.0..=1.0).contains(&self.gate.max_owner_concentration) {
            return Err(ConfigError::ValidationError(format!(
                "max_owner_concentration must be in [0, 1], got {}",
                self.gate.max_owner_concentration
            )));
        }
        if self.alerts.price_change_pct <= 0.0 || self.alerts.volume_change_ratio <= 0.0 {
            return Err(ConfigError::ValidationError(
                "alert thresholds must be > 0".to_string(),
            ));
        }
        if self.alerts.cooldown_minutes < 0 {
            return Err(ConfigError::ValidationError(format!(
                "cooldown_minutes must be >= 0, got {}",
                self.alerts.cooldown_minutes
            )));
        }

        for provider in [
            &self.providers.dexscreener,
            &self.providers.birdeye,
            &self.providers.rugcheck,
        ] {
            if provider.base_url.is_empty() {
                return Err(ConfigError::ValidationError(
                    "provider base_url must not be empty".to_string(),
                ));
            }
            if provider.rate_limit_calls == 0 || provider.rate_limit_period_secs == 0 {
                return Err(ConfigError::ValidationError(
                    "provider rate limit must be > 0".to_string(),
                ));
            }
        }

        // Source-level validation covers intervals and filter patterns
        for section in &self.sources {
            section
                .to_source()
                .validate()
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            tick_interval: std::time::Duration::from_secs(self.monitor.tick_interval_secs),
            max_concurrent_refreshes: self.monitor.max_concurrent_refreshes,
            significant_price_pct: self.monitor.significant_price_pct,
            significant_volume_pct: self.monitor.significant_volume_pct,
            gate: GateConfig {
                min_liquidity_usd: self.gate.min_liquidity_usd,
                min_holders: self.gate.min_holders,
                max_owner_concentration: self.gate.max_owner_concentration,
            },
        }
    }

    pub fn verdict_thresholds(&self) -> VerdictThresholds {
        self.scoring.verdict.clone().unwrap_or_default()
    }

    pub fn monitored_sources(&self) -> Vec<MonitoredSource> {
        self.sources.iter().map(|s| s.to_source()).collect()
    }
}
