//! Request pacing: a fixed-window call counter and a retry backoff policy.

use crate::client::RedditClientError;
use log::{info, warn};
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Settings for [`Throttle`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Calls allowed per window before the throttle pauses.
    pub max_calls: u32,
    /// Length of the counting window, in seconds.
    pub window_secs: u64,
    /// Upper bound on a single pause, in seconds.
    pub ceiling_secs: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_calls: 30,
            window_secs: 60,
            ceiling_secs: 70,
        }
    }
}

/// Coarse fixed-window throttle.
///
/// Every call to [`Throttle::acquire`] counts as one outbound request. Once
/// `max_calls` requests have been made inside the current window, the next
/// acquire sleeps out the rest of the window (never longer than the
/// ceiling) and starts a fresh one. A window that has already run out is
/// reset without sleeping.
#[derive(Debug)]
pub struct Throttle {
    max_calls: u32,
    window: Duration,
    ceiling: Duration,
    count: u32,
    window_start: Instant,
}

impl Throttle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            max_calls: config.max_calls.max(1),
            window: Duration::from_secs(config.window_secs),
            ceiling: Duration::from_secs(config.ceiling_secs),
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Wait until one more request may be sent, then count it.
    pub async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.reset();
        } else if self.count >= self.max_calls {
            let wait = (self.window - elapsed).min(self.ceiling);
            info!(
                "Made {} requests in {:.1}s, pausing for {:.1}s",
                self.count,
                elapsed.as_secs_f64(),
                wait.as_secs_f64()
            );
            sleep(wait).await;
            self.reset();
        }
        self.count += 1;
    }

    /// Requests counted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn window_start(&self) -> Instant {
        self.window_start
    }

    fn reset(&mut self) {
        self.count = 0;
        self.window_start = Instant::now();
    }
}

/// Settings for [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 60_000,
        }
    }
}

/// Exponential backoff with jitter for transient API errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Deterministic part of the delay before retry number `attempt`
    /// (zero-based): `base * 2^attempt`, capped at the maximum.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// How long to wait before retrying after `err`, or `None` when the
    /// error is permanent or the retries are used up.
    ///
    /// A server-provided wait on a rate-limit response replaces the
    /// computed backoff.
    pub fn delay_for(&self, attempt: u32, err: &RedditClientError) -> Option<Duration> {
        if attempt >= self.max_retries || !err.is_transient() {
            return None;
        }
        if let RedditClientError::RateLimited {
            retry_after: Some(wait),
        } = err
        {
            return Some((*wait).min(self.max_delay));
        }
        let delay = self.backoff(attempt);
        let jitter_ms = rand::thread_rng().gen_range(0..=delay.as_millis() as u64 / 2);
        Some(delay + Duration::from_millis(jitter_ms))
    }

    /// Sleep before a retry, logging why.
    pub async fn wait(&self, what: &str, attempt: u32, delay: Duration, err: &RedditClientError) {
        warn!(
            "{} failed ({}), retry {}/{} in {:.1}s",
            what,
            err,
            attempt + 1,
            self.max_retries,
            delay.as_secs_f64()
        );
        sleep(delay).await;
    }
}
