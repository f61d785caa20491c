//! Bounded retry policy for transient remote failures.

use crate::error::{ErrorKind, Result};
use std::future::Future;
use std::time::Duration;

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// How often, and how patiently, to retry a failed remote call.
///
/// Only errors whose [`is_retryable()`](crate::error::ErrorKind::is_retryable)
/// returns `true` are retried. Delays grow exponentially from `base_delay`
/// and are capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never zero.
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}
impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay: DEFAULT_MAX_DELAY.max(base_delay),
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether a failure on attempt number `attempt` (starting at 1) should
    /// be followed by another attempt.
    pub fn should_retry(&self, attempt: u32, retryable: bool) -> bool {
        retryable && attempt < self.attempts
    }

    /// Delay to wait after the failed attempt number `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out.
    ///
    /// `op` is called afresh for every attempt, so it must not hold exclusive
    /// borrows; callers holding a `&mut` session drive the loop themselves
    /// with [`should_retry()`](Self::should_retry) and [`delay()`](Self::delay).
    pub async fn retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(attempt, err.is_retryable()) => {
                    let delay = self.delay(attempt);
                    let kind: &ErrorKind = &err;
                    tracing::warn!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %kind, "Retrying remote operation");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::new(10, Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(9), DEFAULT_MAX_DELAY);
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert!(policy.should_retry(1, true));
        assert!(policy.should_retry(2, true));
        assert!(!policy.should_retry(3, true));
        assert!(!policy.should_retry(1, false));
        assert!(!RetryPolicy::none().should_retry(1, true));
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_from_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::new(3, Duration::from_millis(10))
            .retry("open", || async {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => exn::bail!(ErrorKind::Network("connection reset".to_string())),
                    _ => Ok("session"),
                }
            })
            .await;
        assert_eq!(result.unwrap(), "session");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::new(2, Duration::from_millis(10))
            .retry("open", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                exn::bail!(ErrorKind::Timeout("connect".to_string()))
            })
            .await;
        assert!(matches!(&*result.unwrap_err(), ErrorKind::Timeout(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_skips_permanent_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = RetryPolicy::new(5, Duration::from_millis(10))
            .retry("open", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                exn::bail!(ErrorKind::PermissionDenied("free".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
