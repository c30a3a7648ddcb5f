use crate::error::CompletionError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Error classification consumed by [`RetryPolicy::run`].
pub trait Retryable {
    fn is_transient(&self) -> bool;

    /// Throttling errors back off twice as long as other transient errors.
    fn is_rate_limited(&self) -> bool {
        false
    }
}

impl Retryable for CompletionError {
    fn is_transient(&self) -> bool {
        Self::is_transient(self)
    }

    fn is_rate_limited(&self) -> bool {
        Self::is_rate_limited(self)
    }
}

/// Capped exponential backoff with a fixed attempt ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2_000,
            max_delay_ms: 20_000,
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            multiplier: 2.0,
        }
    }

    /// A policy that never sleeps; handy for stubs and tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if !(self.multiplier.is_finite() && self.multiplier >= 1.0) {
            return Err(format!(
                "retry.multiplier must be a finite value >= 1.0 (got {})",
                self.multiplier
            ));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(format!(
                "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            ));
        }
        Ok(())
    }

    /// Sleep after the `failed_attempt`-th (1-based) failure.
    #[must_use]
    pub fn delay_after(&self, failed_attempt: u32, rate_limited: bool) -> Duration {
        let exponent = failed_attempt.saturating_sub(1).min(32);
        let mut millis = self.base_delay_ms as f64 * self.multiplier.powi(exponent as i32);
        if rate_limited {
            millis *= 2.0;
        }
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Runs `op` until it succeeds, fails permanently, or the attempt ceiling is hit.
    ///
    /// The last error is returned on exhaustion.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt, err.is_rate_limited());
                    log::warn!(
                        "{label}: attempt {attempt}/{max_attempts} failed ({err}); retrying in {} ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        log::warn!("{label}: giving up after {attempt} attempts ({err})");
                    }
                    return Err(err);
                }
            }
        }
    }
}
