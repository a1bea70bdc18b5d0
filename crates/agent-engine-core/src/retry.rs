//! Bounded retry with exponential backoff.

use std::{future::Future, time::Duration};

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::EngineError;

/// Retry policy for reads that race asynchronous initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first attempt.
    pub initial_delay: Duration,
    /// Delay after the first failure; doubles after each further failure.
    pub base_delay: Duration,
    /// Cap on a single backoff delay.
    pub max_delay: Duration,
    /// Budget across all attempts, including the initial delay.
    pub max_elapsed: Duration,
    /// Upper bound on attempts.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            max_elapsed: Duration::from_secs(30),
            max_attempts: 10,
        }
    }
}

impl RetryPolicy {
    /// Policy without any delays, bounded by attempts only.
    #[must_use]
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay: Duration::ZERO,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_elapsed: Duration::MAX,
            max_attempts,
        }
    }

    /// Single attempt, no delay.
    #[must_use]
    pub const fn none() -> Self {
        Self::immediate(1)
    }

    /// Backoff delay after the `attempt`-th failure (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the policy is exhausted. The last error is returned on exhaustion.
    ///
    /// # Errors
    /// Returns the error of the final attempt.
    pub async fn retry<F, Fut, T>(&self, mut operation: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, EngineError>>,
    {
        let start = Instant::now();
        if !self.initial_delay.is_zero() {
            sleep(self.initial_delay).await;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    if start.elapsed().saturating_add(delay) > self.max_elapsed {
                        debug!(attempt, "Retry budget exhausted: {e}");
                        return Err(e);
                    }
                    debug!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying after error: {e}"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll `check` until it reports a value, backing off between checks.
    ///
    /// `Ok(None)` means not ready yet. Retryable errors are polled through
    /// like a pending result.
    ///
    /// # Errors
    /// Returns `EngineError::Timeout` when the policy is exhausted while still
    /// pending, or the first non-retryable error.
    pub async fn poll<F, Fut, T>(&self, mut check: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, EngineError>>,
    {
        let start = Instant::now();
        if !self.initial_delay.is_zero() {
            sleep(self.initial_delay).await;
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match check().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(e) if e.is_retryable() => debug!(attempt, "Poll failed, will retry: {e}"),
                Err(e) => return Err(e),
            }

            let delay = self.backoff(attempt);
            if attempt >= self.max_attempts
                || start.elapsed().saturating_add(delay) > self.max_elapsed
            {
                return Err(EngineError::Timeout(start.elapsed()));
            }
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(40), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let mut calls = 0;
        let result = RetryPolicy::immediate(5)
            .retry(|| {
                calls += 1;
                let n = calls;
                async move {
                    if n < 3 {
                        Err(EngineError::NotFound("s1".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::immediate(5)
            .retry(|| {
                calls += 1;
                async { Err(EngineError::Decode("bad".into())) }
            })
            .await;
        assert!(matches!(result, Err(EngineError::Decode(_))));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_attempts_exhausted() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::immediate(3)
            .retry(|| {
                calls += 1;
                async { Err(EngineError::NotFound("s1".into())) }
            })
            .await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_elapsed_budget_exhausted() {
        let policy = RetryPolicy {
            initial_delay: Duration::ZERO,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(60),
            max_elapsed: Duration::from_millis(10),
            max_attempts: 10,
        };
        let mut calls = 0;
        let result: Result<(), _> = policy
            .retry(|| {
                calls += 1;
                async { Err(EngineError::Http("reset".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_poll_until_ready() {
        let mut calls = 0;
        let result = RetryPolicy::immediate(10)
            .poll(|| {
                calls += 1;
                let n = calls;
                async move {
                    match n {
                        1 => Ok(None),
                        2 => Err(EngineError::Http("reset".into())),
                        _ => Ok(Some("done")),
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_poll_times_out() {
        let result: Result<(), _> = RetryPolicy::immediate(4)
            .poll(|| async { Ok(None) })
            .await;
        assert!(matches!(result, Err(EngineError::Timeout(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_settles_before_first_attempt() {
        let start = Instant::now();
        let mut first_attempt = None;
        let result = RetryPolicy::default()
            .retry(|| {
                first_attempt.get_or_insert_with(|| start.elapsed());
                async { Ok::<_, EngineError>("ready") }
            })
            .await;
        assert_eq!(tokio_test::assert_ok!(result), "ready");
        assert!(first_attempt.unwrap() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_policy_stays_within_budget() {
        let start = Instant::now();
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::default()
            .retry(|| {
                calls += 1;
                async { Err(EngineError::NotFound("s1".into())) }
            })
            .await;
        tokio_test::assert_err!(result);
        assert!(calls > 1);
        assert!(start.elapsed() <= Duration::from_secs(30));
    }
}
