//! Bounded exponential backoff for rate-limited model calls.

use crate::error::{OrchestrationError, Result, SERVICE_BUSY_MESSAGE};
use marquee_abstraction::ModelError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

/// Default number of invocations per wrapped call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// How a remote call is retried.
///
/// Only rate-limit errors are retried. Everything else is returned to the
/// caller on the spot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations, including the first one.
    pub max_attempts: u32,
    /// Wait before the first retry; doubles on every subsequent retry.
    pub initial_delay: Duration,
    /// Optional deadline for each individual attempt.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            attempt_timeout: None,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = Some(attempt_timeout);
        self
    }

    /// Retries without waiting. Meant for tests and offline engines.
    #[must_use]
    pub fn immediate() -> Self {
        Self { initial_delay: Duration::ZERO, ..Self::default() }
    }

    /// Delay slept after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(2_u32.saturating_pow(attempt))
    }

    /// Runs `op` until it succeeds, fails fatally, or runs out of attempts.
    ///
    /// # Errors
    /// Returns `ServiceBusy` when the last attempt is still rate limited, and the
    /// adapter's own error (wrapped) for anything that is not a rate limit.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ModelError>>,
    {
        let max_attempts = self.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let outcome = match self.attempt_timeout {
                Some(limit) => match timeout(limit, op()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ModelError::Transport(format!(
                        "Request timed out after {}s",
                        limit.as_secs_f32()
                    ))),
                },
                None => op().await,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt = attempt + 1, "Model call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_rate_limited() {
                debug!(error = %err, "Model call failed with a non-retryable error");
                return Err(err.into());
            }

            if attempt + 1 >= max_attempts {
                warn!(attempts = max_attempts, error = %err, "Rate limit persisted, giving up");
                return Err(OrchestrationError::ServiceBusy {
                    attempts: max_attempts,
                    message: SERVICE_BUSY_MESSAGE.to_string(),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                attempt = attempt + 1,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Rate limited, retrying after backoff"
            );
            sleep(delay).await;
        }

        Err(OrchestrationError::RetryExhausted)
    }
}

/// Wraps `op` with the default policy capped at `max_attempts`.
///
/// # Errors
/// See [`RetryPolicy::run`].
pub async fn with_retry<T, F, Fut>(op: F, max_attempts: u32) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, ModelError>>,
{
    RetryPolicy::default().with_max_attempts(max_attempts).run(op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn rate_limited() -> ModelError {
        ModelError::RateLimited { provider: "test".to_string(), message: None }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_rate_limits_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let stamps = Arc::new(std::sync::Mutex::new(Vec::new()));
        let start = Instant::now();

        let result = with_retry(
            || {
                let calls = Arc::clone(&calls);
                let stamps = Arc::clone(&stamps);
                async move {
                    stamps.lock().unwrap().push(start.elapsed());
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(rate_limited())
                    } else {
                        Ok("done")
                    }
                }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stamps = stamps.lock().unwrap();
        assert_eq!(stamps[0], Duration::ZERO);
        assert_eq!(stamps[1] - stamps[0], Duration::from_millis(1000));
        assert_eq!(stamps[2] - stamps[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_is_not_delayed() {
        let start = Instant::now();
        let result: Result<u8> = RetryPolicy::default().run(|| async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_service_busy() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ModelError::Transport("HTTP 429 RESOURCE_EXHAUSTED".to_string())) }
            },
            3,
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(OrchestrationError::ServiceBusy { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, SERVICE_BUSY_MESSAGE);
                assert!(!message.contains("429"));
            }
            other => panic!("Expected ServiceBusy, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();
        let result: Result<()> = RetryPolicy::default()
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ModelError::Transport("connection refused".to_string())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(matches!(result, Err(OrchestrationError::Model(ModelError::Transport(_)))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_fatal() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default().with_attempt_timeout(Duration::from_secs(5));
        let result: Result<()> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(OrchestrationError::Model(ModelError::Transport(ref m))) if m.contains("timed out")));
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(RetryPolicy::immediate().delay_for(3), Duration::ZERO);
        assert_eq!(RetryPolicy::default().with_max_attempts(0).max_attempts, 1);
    }
}
