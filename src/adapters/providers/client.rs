//! Fetch Client
//!
//! Rate-limited, cached, retrying request executor shared by all provider
//! adapters. A cache hit bypasses both the rate limiter and the network.
//! Transient failures retry with exponential backoff; permanent failures
//! (rate-limit rejections, non-retryable 4xx, decode errors) surface
//! immediately. Any failure flips the internal health flag false; only a
//! successful probe flips it back.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::ttl_cache::TtlCache;
use crate::ports::provider::ProviderError;

use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;

/// Per-provider client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchClientConfig {
    pub name: String,
    pub base_url: String,
    pub rate_limit_calls: usize,
    pub rate_limit_period_secs: u64,
    pub cache_ttl_secs: u64,
    pub timeout_secs: u64,
    /// Path probed for health checks
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Optional API-key header, e.g. ("X-API-KEY", "...")
    #[serde(default)]
    pub api_key_header: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_probe_path() -> String {
    "/".to_string()
}

fn default_probe_interval() -> u64 {
    60
}

impl FetchClientConfig {
    pub fn new(name: &str, base_url: &str) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit_calls: 100,
            rate_limit_period_secs: 60,
            cache_ttl_secs: 300,
            timeout_secs: 10,
            probe_path: default_probe_path(),
            probe_interval_secs: default_probe_interval(),
            retry: RetryPolicy::default(),
            api_key_header: None,
            api_key: None,
        }
    }
}

/// Request counters for one client.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub errors: u64,
    pub total_duration_ms: u64,
}

impl MetricsSnapshot {
    pub fn avg_duration_ms(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        self.total_duration_ms as f64 / self.requests as f64
    }
}

/// Rate-limited, cached, retrying HTTP executor for one provider.
pub struct FetchClient {
    name: String,
    base_url: String,
    http: reqwest::Client,
    limiter: RateLimiter,
    cache: Mutex<TtlCache<String, Value>>,
    retry: RetryPolicy,
    timeout_secs: u64,
    probe_path: String,
    probe_interval: Duration,
    last_probe: Mutex<Option<Instant>>,
    healthy: AtomicBool,
    requests: AtomicU64,
    errors: AtomicU64,
    total_duration_ms: AtomicU64,
}

impl FetchClient {
    pub fn new(config: FetchClientConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        if let (Some(header), Some(key)) = (&config.api_key_header, &config.api_key) {
            let name = HeaderName::from_bytes(header.as_bytes())
                .map_err(|e| ProviderError::Transport(format!("bad header name: {e}")))?;
            let value = HeaderValue::from_str(key)
                .map_err(|e| ProviderError::Transport(format!("bad header value: {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            name: config.name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            limiter: RateLimiter::new(config.rate_limit_calls, Duration::from_secs(config.rate_limit_period_secs)),
            cache: Mutex::new(TtlCache::new(Duration::from_secs(config.cache_ttl_secs))),
            retry: config.retry,
            timeout_secs: config.timeout_secs,
            probe_path: config.probe_path,
            probe_interval: Duration::from_secs(config.probe_interval_secs),
            last_probe: Mutex::new(None),
            healthy: AtomicBool::new(true),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_duration_ms: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// GET a JSON payload. With a cache key, a valid cached response is
    /// returned without touching the limiter or the network; a fresh
    /// response is cached on the way out.
    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
        cache_key: Option<&str>,
    ) -> Result<Value, ProviderError> {
        if let Some(key) = cache_key {
            if let Some(hit) = self.cache.lock().await.get(&key.to_string()) {
                debug!(provider = %self.name, key, "Cache hit");
                return Ok(hit);
            }
        }

        let value =
            super::retry::retry_async(&self.retry, &self.name, || self.execute_once(path, params))
                .await?;

        if let Some(key) = cache_key {
            self.cache.lock().await.insert(key.to_string(), value.clone());
        }
        Ok(value)
    }

    async fn execute_once(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ProviderError> {
        self.limiter.acquire().await;

        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();
        self.requests.fetch_add(1, Ordering::Relaxed);

        let result = self.http.get(&url).query(params).send().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.total_duration_ms.fetch_add(elapsed_ms, Ordering::Relaxed);

        let response = result.map_err(|e| {
            self.record_failure();
            if e.is_timeout() {
                ProviderError::Timeout(self.timeout_secs)
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            self.record_failure();
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            self.record_failure();
            ProviderError::Decode(e.to_string())
        })
    }

    fn record_failure(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        self.healthy.store(false, Ordering::Relaxed);
    }

    /// Health probe; the result is cached for the probe interval.
    pub async fn probe(&self) -> bool {
        {
            let last = self.last_probe.lock().await;
            if let Some(at) = *last {
                if at.elapsed() < self.probe_interval {
                    return self.healthy.load(Ordering::Relaxed);
                }
            }
        }

        let ok = self.execute_once(&self.probe_path, &[]).await.is_ok();
        self.healthy.store(ok, Ordering::Relaxed);
        *self.last_probe.lock().await = Some(Instant::now());
        ok
    }

    /// Current health flag without probing.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            total_duration_ms: self.total_duration_ms.load(Ordering::Relaxed),
        }
    }

    /// Free rate-limit slots right now.
    pub async fn rate_limit_available(&self) -> usize {
        self.limiter.available().await
    }

    /// Seed the response cache directly (used by adapters that transform
    /// and re-store payloads, and by tests).
    pub async fn seed_cache(&self, key: &str, value: Value) {
        self.cache.lock().await.insert(key.to_string(), value);
    }

    /// Drop every cached response.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("healthy", &self.is_healthy())
            .finish()
    }
}
