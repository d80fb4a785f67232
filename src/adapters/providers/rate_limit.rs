//! Sliding-Window Rate Limiter
//!
//! Tracks call timestamps inside a rolling period. At capacity the caller
//! suspends until the oldest timestamp exits the window, then re-evaluates.
//! The lock is never held across a sleep, so waiting callers do not block
//! concurrent requests that still have capacity.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

#[derive(Debug)]
struct Window {
    timestamps: VecDeque<Instant>,
    waiting: usize,
}

impl Window {
    fn prune(&mut self, now: Instant, period: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if now.duration_since(*oldest) > period {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Sliding-window limiter: at most `calls` acquisitions per `period`.
#[derive(Debug)]
pub struct RateLimiter {
    calls: usize,
    period: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(calls: usize, period: Duration) -> Self {
        Self {
            calls,
            period,
            window: Mutex::new(Window {
                timestamps: VecDeque::new(),
                waiting: 0,
            }),
        }
    }

    /// Acquire one slot, suspending while the window is at capacity.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                window.prune(now, self.period);

                if window.timestamps.len() < self.calls {
                    window.timestamps.push_back(now);
                    return;
                }

                // Oldest call leaving the window frees the next slot
                let oldest = *window.timestamps.front().unwrap_or(&now);
                window.waiting += 1;
                (oldest + self.period).saturating_duration_since(now)
            };

            debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            sleep(wait.max(Duration::from_millis(1))).await;

            let mut window = self.window.lock().await;
            if window.waiting > 0 {
                window.waiting -= 1;
            }
        }
    }

    /// Slots currently free; never negative.
    pub async fn available(&self) -> usize {
        let mut window = self.window.lock().await;
        window.prune(Instant::now(), self.period);
        self.calls.saturating_sub(window.timestamps.len())
    }

    /// Number of callers currently suspended on the limiter.
    pub async fn waiting(&self) -> usize {
        self.window.lock().await.waiting
    }

    pub fn max_calls(&self) -> usize {
        self.calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sixth_call_waits_for_window() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        let start = Instant::now();

        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available().await, 0);

        // Sixth call must not resolve until the first timestamp leaves the
        // one-second window.
        limiter.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_secs(1),
            "sixth call resolved after only {elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_never_negative() {
        let limiter = RateLimiter::new(2, Duration::from_secs(1));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.available().await, 0);

        // Window rolls over and capacity returns
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(limiter.available().await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_returns_incrementally() {
        let limiter = RateLimiter::new(3, Duration::from_secs(1));
        limiter.acquire().await;
        sleep(Duration::from_millis(500)).await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.available().await, 0);

        // Only the first timestamp has left the window at t=1.1s
        sleep(Duration::from_millis(600)).await;
        assert_eq!(limiter.available().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_all_resolve() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new(2, Duration::from_millis(100)));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let l = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { l.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
