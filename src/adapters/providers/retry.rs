//! Retry Policy
//!
//! Exponential backoff with jitter for transient provider failures.
//! [`retry_async`] consults [`ProviderError::is_transient`] before retrying;
//! permanent errors fail on the first attempt.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use crate::ports::provider::ProviderError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Fraction of the delay added/subtracted as random jitter
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter_factor: 0.3,
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Backoff delay for a zero-indexed attempt: base × 2^attempt, clamped,
    /// with ±jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_ms as f64 * 2.0_f64.powi(attempt as i32);
        let clamped = base.min(self.max_delay_ms as f64);

        let delay = if self.jitter_factor > 0.0 {
            let jitter_range = clamped * self.jitter_factor;
            let jitter: f64 = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            (clamped + jitter).max(0.0)
        } else {
            clamped
        };

        Duration::from_millis(delay as u64)
    }
}

/// Retry a fallible provider operation with exponential backoff. Only
/// transient errors are retried; the last error is returned once the
/// attempt cap is reached.
pub async fn retry_async<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient error, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn deterministic(base_ms: u64, max_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay_ms: base_ms,
            max_delay_ms: max_ms,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn test_delays_double_per_attempt() {
        let policy = deterministic(100, 10_000);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        // Later delays strictly exceed earlier ones
        assert!(policy.delay_for_attempt(2) > policy.delay_for_attempt(1));
    }

    #[test]
    fn test_delay_clamped_to_max() {
        let policy = deterministic(100, 300);
        assert_eq!(policy.delay_for_attempt(5), Duration::from_millis(300));
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 10_000,
            jitter_factor: 0.3,
        };
        for _ in 0..100 {
            let d = policy.delay_for_attempt(0).as_millis() as f64;
            assert!((700.0..=1300.0).contains(&d), "delay {d} outside jitter band");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_twice_then_succeed_on_third_attempt() {
        let policy = deterministic(100, 10_000);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result = retry_async(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 2 {
                    Err(ProviderError::Timeout(1))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let policy = deterministic(1, 10);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), _> = retry_async(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Decode("bad json".into()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_cap_surfaces_last_error() {
        let policy = deterministic(1, 10);
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&attempts);

        let result: Result<(), _> = retry_async(&policy, "test", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Transport("refused".into()))
            }
        })
        .await;

        assert!(matches!(result, Err(ProviderError::Transport(_))));
        // Initial attempt plus max_retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
