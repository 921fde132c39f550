//! Bounded exponential backoff for transient collaborator failures.
//!
//! Only errors that report themselves as retryable are retried; everything
//! else is returned immediately.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Errors that know whether a retry could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry budget: `max_retries` additional attempts after the first, sleeping
/// `base_delay_ms * 2^attempt` between them, capped at `max_delay_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    200
}
fn default_max_delay_ms() -> u64 {
    5_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// No retries at all.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let ms = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// budget is exhausted. The last error is returned.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut f: F) -> Result<T, E>
    where
        E: Retryable + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        ?delay,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        retryable: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error (retryable: {})", self.retryable)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.retryable
        }
    }

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 4,
        }
    }

    #[test]
    fn test_delays_double_and_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
        assert_eq!(policy.delay_for(40), Duration::from_millis(5_000));
    }

    #[tokio::test]
    async fn test_exhausts_budget_on_retryable_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: true }) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), TestError> = fast()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: false }) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(TestError { retryable: true })
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_none_policy_single_attempt() {
        let calls = AtomicU32::new(0);
        let _: Result<(), TestError> = RetryPolicy::none()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError { retryable: true }) }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
