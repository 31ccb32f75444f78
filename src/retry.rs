//! Retry configuration and the token-rejection retry loop.
//!
//! The scoring service does not advertise token expiry; a stale token is
//! only detected when a request fails with a token-type error code. The
//! [`with_token_retry()`] helper re-runs the whole authenticate-and-post
//! sequence in that case, up to [`RetryConfig::max_attempts`].

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::telemetry;
use crate::{Result, ScoringError};

/// Configuration for retrying after a rejected access token.
///
/// ```rust
/// # use wml_scoring::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(100));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: none.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 5s.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::ZERO,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    ///
    /// `initial_delay * 2^attempt`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// A failed attempt, with the credential it was made with if one had been
/// obtained before the failure.
#[derive(Debug)]
pub(crate) struct AttemptError<C> {
    pub error: ScoringError,
    pub credential: Option<C>,
}

impl<C> From<ScoringError> for AttemptError<C> {
    fn from(error: ScoringError) -> Self {
        Self {
            error,
            credential: None,
        }
    }
}

/// Run `attempt` until it succeeds, fails with a non-token error, or the
/// attempt budget is spent.
///
/// `attempt` receives the 0-indexed attempt number. After a token rejection
/// `invalidate` is awaited with the rejected credential before the next
/// attempt, so that attempt re-authenticates. Once the budget is spent the
/// last rejection is returned unchanged.
pub(crate) async fn with_token_retry<C, F, Fut, T, I, IFut>(
    config: &RetryConfig,
    operation: &str,
    attempt: F,
    invalidate: I,
) -> Result<T>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError<C>>>,
    I: Fn(C) -> IFut,
    IFut: Future<Output = ()>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        let AttemptError { error, credential } = match attempt(attempts).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        attempts += 1;

        // permanent error, no retry
        if !error.is_token_rejection() {
            return Err(error);
        }
        if let Some(credential) = credential {
            invalidate(credential).await;
        }

        if attempts >= max_attempts {
            warn!(
                operation,
                attempts,
                error = %error,
                "too many failed attempts"
            );
            return Err(error);
        }

        metrics::counter!(telemetry::RETRIES_TOTAL, "operation" => operation.to_owned())
            .increment(1);
        let delay = config.delay_for_attempt(attempts - 1);
        warn!(
            operation,
            attempt = attempts,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "access token rejected, re-authenticating"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn rejection(code: &str) -> ScoringError {
        ScoringError::Api {
            status: 401,
            code: Some(code.to_string()),
            message: "rejected".to_string(),
        }
    }

    #[test]
    fn default_is_three_attempts_without_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(RetryConfig::disabled().max_attempts, 1);
    }

    #[test]
    fn delay_grows_and_is_capped() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_millis(300));
        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn stops_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let invalidations = &AtomicU32::new(0);
        let result: Result<()> = with_token_retry(
            &RetryConfig::default(),
            "test",
            move |_| async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(AttemptError {
                    error: rejection("invalid_token"),
                    credential: Some(()),
                })
            },
            move |()| async move {
                invalidations.fetch_add(1, Ordering::Relaxed);
            },
        )
        .await;

        assert!(result.unwrap_err().is_token_rejection());
        assert_eq!(calls.load(Ordering::Relaxed), 3);
        assert_eq!(invalidations.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn permanent_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let invalidations = &AtomicU32::new(0);
        let result: Result<()> = with_token_retry(
            &RetryConfig::default(),
            "test",
            move |_| async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(AttemptError {
                    error: rejection("invalid_payload"),
                    credential: Some(()),
                })
            },
            move |()| async move {
                invalidations.fetch_add(1, Ordering::Relaxed);
            },
        )
        .await;

        assert_eq!(result.unwrap_err().code(), Some("invalid_payload"));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
        assert_eq!(invalidations.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn succeeds_on_later_attempt() {
        let result = with_token_retry(
            &RetryConfig::default(),
            "test",
            |n| async move {
                if n == 0 {
                    Err(AttemptError {
                        error: rejection("token_expired"),
                        credential: Some(()),
                    })
                } else {
                    Ok(n)
                }
            },
            |()| async {},
        )
        .await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts() {
        let start = tokio::time::Instant::now();
        let result = with_token_retry(
            &RetryConfig::new().initial_delay(Duration::from_secs(1)),
            "test",
            |n| async move {
                if n < 2 {
                    Err(AttemptError {
                        error: rejection("invalid_token"),
                        credential: Some(()),
                    })
                } else {
                    Ok(n)
                }
            },
            |()| async {},
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        // 1s before the second attempt, 2s before the third.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = with_token_retry(
            &RetryConfig::new().max_attempts(0),
            "test",
            move |_| async move {
                calls.fetch_add(1, Ordering::Relaxed);
                Err(AttemptError::<()>::from(rejection("invalid_token")))
            },
            |()| async {},
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}
