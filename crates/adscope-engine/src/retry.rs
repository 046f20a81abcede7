//! Bounded exponential back-off for single upstream calls.
//!
//! [`retry`] wraps any fallible async operation and retries on errors that
//! [`SourceError::is_retryable`] classifies as transient. Non-retryable
//! errors are returned immediately. The outcome is a tagged
//! `Result<T, RetryFailure>` carrying the attempt count, so callers decide
//! whether an exhausted call is fatal (keyword pages) or skippable (shared
//! lists).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use adscope_core::EngineSettings;
use thiserror::Error;

use crate::error::SourceError;

/// Called with `(attempt_index, error)` before every retry. `attempt_index`
/// is the zero-based index of the attempt that just failed.
pub type RetryHook = Arc<dyn Fn(u32, &SourceError) + Send + Sync>;

/// Default hook: one structured warning per retry.
#[must_use]
pub fn logging_hook() -> RetryHook {
    Arc::new(|attempt: u32, error: &SourceError| {
        tracing::warn!(attempt, error = %error, "transient upstream error, retrying after back-off");
    })
}

/// Back-off schedule and attempt budget for one call chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first; never exceeded.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub base: f64,
    pub max_delay: Duration,
    /// Stretch each delay by a random factor in `[1.0, 1.25]`.
    pub jitter: bool,
    /// Upper bound for a single attempt; elapsing counts as a retryable timeout.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&EngineSettings::default())
    }
}

impl From<&EngineSettings> for RetryPolicy {
    fn from(settings: &EngineSettings) -> Self {
        Self {
            max_attempts: settings.retry_max_attempts,
            initial_delay: Duration::from_millis(settings.retry_initial_delay_ms),
            base: settings.retry_backoff_base,
            max_delay: Duration::from_millis(settings.retry_max_delay_ms),
            jitter: settings.retry_jitter,
            attempt_timeout: (settings.attempt_timeout_secs > 0)
                .then(|| Duration::from_secs(settings.attempt_timeout_secs)),
        }
    }
}

impl RetryPolicy {
    /// A policy that retries `max_attempts - 1` times without sleeping.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            base: 1.0,
            max_delay: Duration::ZERO,
            jitter: false,
            attempt_timeout: None,
        }
    }

    /// Un-jittered wait after the attempt with index `attempt`:
    /// `min(max_delay, initial_delay * base^attempt)`.
    ///
    /// | attempt | initial 1 s, base 2 |
    /// |---------|---------------------|
    /// | 0       | 1 s                 |
    /// | 1       | 2 s                 |
    /// | 2       | 4 s                 |
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.base.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        if secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(secs)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        if self.jitter {
            delay.mul_f64(1.0 + rand::random::<f64>() * 0.25)
        } else {
            delay
        }
    }
}

/// Terminal outcome of a call chain that did not succeed.
#[derive(Debug, Clone, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct RetryFailure {
    pub attempts: u32,
    /// `true` when the last error was retryable but the attempt budget ran out.
    pub exhausted: bool,
    #[source]
    pub error: SourceError,
}

/// Runs `operation` until it succeeds, fails non-retryably, or
/// `policy.max_attempts` attempts have been made.
///
/// `on_retry` is invoked before every back-off sleep.
///
/// # Errors
///
/// Returns [`RetryFailure`] with `exhausted = false` for a non-retryable
/// error, or `exhausted = true` once the attempt budget is spent.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    on_retry: &(dyn Fn(u32, &SourceError) + Send + Sync),
    mut operation: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let outcome = match policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, operation())
                .await
                .unwrap_or_else(|_| {
                    Err(SourceError::Timeout(format!(
                        "attempt exceeded {}ms",
                        limit.as_millis()
                    )))
                }),
            None => operation().await,
        };

        let error = match outcome {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(RetryFailure {
                attempts,
                exhausted: false,
                error,
            });
        }
        if attempts >= max_attempts {
            return Err(RetryFailure {
                attempts,
                exhausted: true,
                error,
            });
        }

        let attempt_index = attempts - 1;
        on_retry(attempt_index, &error);
        let delay = policy.backoff(attempt_index);
        tracing::debug!(
            attempt = attempts,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "sleeping before retry"
        );
        tokio::time::sleep(delay).await;
    }
}
