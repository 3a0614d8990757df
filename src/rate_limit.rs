//! Rate limiting for DNS queries
//!
//! Token bucket limiter shared by brute force and validation, plus a retry
//! helper with configurable backoff for transient lookup failures.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::RateLimitConfig;

/// A token bucket rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    tokens: f64,
    max_tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_update: Instant,
    /// False when configured with 0 (unlimited)
    enabled: bool,
}

impl RateLimiter {
    /// If requests_per_second is 0, rate limiting is disabled
    pub fn new(requests_per_second: u32) -> Self {
        let enabled = requests_per_second > 0;
        let max_tokens = if enabled {
            // Allow burst of up to 1 second worth of requests
            requests_per_second as f64
        } else {
            f64::INFINITY
        };

        Self {
            tokens: max_tokens,
            max_tokens,
            refill_rate: requests_per_second as f64,
            last_update: Instant::now(),
            enabled,
        }
    }

    fn refill(&mut self) {
        if !self.enabled {
            return;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_update = now;
    }

    /// Try to acquire a token, returning time to wait if not available
    pub fn try_acquire(&mut self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }

        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            None
        } else {
            let wait_secs = (1.0 - self.tokens) / self.refill_rate;
            Some(Duration::from_secs_f64(wait_secs))
        }
    }

    /// Acquire a token, waiting if necessary
    pub async fn acquire(&mut self) {
        while let Some(wait_duration) = self.try_acquire() {
            debug!("Rate limiter waiting {:?} for token", wait_duration);
            sleep(wait_duration).await;
        }
    }
}

/// Thread-safe rate limiter wrapper
#[derive(Debug, Clone)]
pub struct SharedRateLimiter {
    inner: Arc<Mutex<RateLimiter>>,
}

impl SharedRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RateLimiter::new(requests_per_second))),
        }
    }

    pub async fn acquire(&self) {
        let mut limiter = self.inner.lock().await;
        limiter.acquire().await;
    }
}

/// Retry helper with configurable backoff
#[derive(Debug, Clone)]
pub struct RetryHelper {
    config: RateLimitConfig,
}

impl RetryHelper {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Execute an async operation, retrying failures for which
    /// `should_retry` returns true, with backoff between attempts.
    pub async fn with_retry_if<T, E, F, Fut, P>(
        &self,
        operation: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Debug,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt > self.config.max_retries || !should_retry(&e) {
                        return Err(e);
                    }

                    let delay = self.config.calculate_backoff_delay(attempt);
                    debug!(
                        "Attempt {} failed ({:?}), retrying in {:?} with {:?} backoff",
                        attempt, e, delay, self.config.backoff_strategy
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Rate limiting context for one discovery run
#[derive(Debug, Clone)]
pub struct RateLimitContext {
    /// Shared across brute force and validation lookups
    pub dns_limiter: SharedRateLimiter,
    pub config: RateLimitConfig,
}

impl RateLimitContext {
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self {
            dns_limiter: SharedRateLimiter::new(config.dns_queries_per_second),
            config: config.clone(),
        }
    }

    pub fn retry_helper(&self) -> RetryHelper {
        RetryHelper::new(&self.config)
    }

    pub fn log_config(&self) {
        let dns_status = if self.config.dns_queries_per_second > 0 {
            format!("{} qps", self.config.dns_queries_per_second)
        } else {
            "unlimited".to_string()
        };

        debug!(
            "Rate limiting: DNS={}, Backoff={:?}, Max retries={}",
            dns_status, self.config.backoff_strategy, self.config.max_retries
        );
    }
}

impl Default for RateLimitContext {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
