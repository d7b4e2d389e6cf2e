//! Bounded retry with exponential backoff
//!
//! Every retried remote call in the pipeline goes through [`RetryPolicy::run`].
//! The policy decides how many attempts are made, how long to wait between
//! them, which failures are worth another attempt and whether later attempts
//! may skip certificate validation.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::limits;
use crate::errors::{RetryError, TransportError, TransportResult};

/// Per-attempt context handed to the retried operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number
    pub number: u32,
    /// Whether the transport must validate server certificates
    pub verify_tls: bool,
}

/// Predicate deciding whether a failure is retried
pub type RetryPredicate = fn(&TransportError) -> bool;

/// Bounded-attempt retry policy with exponential backoff
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, first try included
    pub max_attempts: u32,
    /// Delay unit; attempt n waits `base_delay * 2^(n-1)`
    pub base_delay: Duration,
    /// Skip certificate validation on attempts after the first.
    ///
    /// Weakens transport security; off unless explicitly configured.
    pub allow_insecure_retry: bool,
    retryable: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("allow_insecure_retry", &self.allow_insecure_retry)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            limits::MAX_ATTEMPTS,
            Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
        )
    }
}

impl RetryPolicy {
    /// Creates a policy retrying transient failures only
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            allow_insecure_retry: false,
            retryable: TransportError::is_transient,
        }
    }

    /// Policy making exactly one attempt
    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Enables or disables skipping certificate validation on retries
    pub fn with_insecure_retry(mut self, allow: bool) -> Self {
        self.allow_insecure_retry = allow;
        self
    }

    /// Replaces the retryable-failure predicate
    pub fn with_retryable(mut self, predicate: RetryPredicate) -> Self {
        self.retryable = predicate;
        self
    }

    /// Whether `error` is retried under this policy
    pub fn is_retryable(&self, error: &TransportError) -> bool {
        (self.retryable)(error)
    }

    /// Backoff slept before attempt `number`; zero for the first attempt
    pub fn delay_before(&self, number: u32) -> Duration {
        if number <= 1 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(number - 1);
        self.base_delay.saturating_mul(factor)
    }

    /// Context for attempt `number`
    pub fn attempt(&self, number: u32) -> Attempt {
        Attempt {
            number,
            verify_tls: number == 1 || !self.allow_insecure_retry,
        }
    }

    /// Runs `op` until it succeeds, fails permanently or attempts run out
    ///
    /// `operation` labels the log lines. The returned error carries the last
    /// failure and the number of attempts made.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, RetryError>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = TransportResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut number = 1;

        loop {
            let delay = self.delay_before(number);
            if !delay.is_zero() {
                debug!(
                    "{}: backing off {}ms before attempt {}/{}",
                    operation,
                    delay.as_millis(),
                    number,
                    max_attempts
                );
                tokio::time::sleep(delay).await;
            }

            let attempt = self.attempt(number);
            if !attempt.verify_tls {
                warn!(
                    "{}: attempt {}/{} skips certificate validation",
                    operation, number, max_attempts
                );
            }

            match op(attempt).await {
                Ok(value) => {
                    if number > 1 {
                        info!(
                            "{}: succeeded on attempt {}/{}",
                            operation, number, max_attempts
                        );
                    } else {
                        debug!("{}: succeeded", operation);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let retryable = self.is_retryable(&error);
                    warn!(
                        "{}: attempt {}/{} failed ({}): {}",
                        operation,
                        number,
                        max_attempts,
                        error.class(),
                        error
                    );

                    if !retryable || number >= max_attempts {
                        if !retryable {
                            debug!("{}: {} failure is not retried", operation, error.class());
                        }
                        return Err(RetryError {
                            operation: operation.to_string(),
                            attempts: number,
                            source: error,
                        });
                    }
                    number += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use crate::errors::NetworkFailure;

    fn timeout() -> TransportError {
        TransportError::Network {
            kind: NetworkFailure::Timeout,
            message: "timed out".to_string(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert!(!policy.allow_insecure_retry);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(4));
    }

    #[test]
    fn test_certificate_validation_per_attempt() {
        let strict = RetryPolicy::default();
        assert!(strict.attempt(1).verify_tls);
        assert!(strict.attempt(2).verify_tls);
        assert!(strict.attempt(3).verify_tls);

        let lenient = RetryPolicy::default().with_insecure_retry(true);
        assert!(lenient.attempt(1).verify_tls);
        assert!(!lenient.attempt(2).verify_tls);
        assert!(!lenient.attempt(3).verify_tls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result = policy
            .run("fragment 1", |attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt.number < 2 {
                        Err(timeout())
                    } else {
                        Ok(attempt.number)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_with_exponential_backoff() {
        let policy = RetryPolicy::default();
        let started = Instant::now();
        let mut seen = Vec::new();

        let result: Result<(), RetryError> = policy
            .run("fragment 2", |attempt| {
                seen.push((attempt.number, started.elapsed()));
                async { Err(TransportError::Status { status: 503 }) }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert!(matches!(err.source, TransportError::Status { status: 503 }));

        let numbers: Vec<u32> = seen.iter().map(|(number, _)| *number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);

        let close_to = |elapsed: Duration, expected: Duration| {
            elapsed >= expected && elapsed < expected + Duration::from_millis(50)
        };
        assert!(close_to(seen[0].1, Duration::ZERO));
        assert!(close_to(seen[1].1, Duration::from_secs(2)));
        assert!(close_to(seen[2].1, Duration::from_secs(6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_not_retried_by_default() {
        let policy = RetryPolicy::default();
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), RetryError> = policy
            .run("finalize", |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransportError::Rejected {
                        result: 0,
                        body: "{\"result\":0}".to_string(),
                    })
                }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_predicate_retries_rejections() {
        let policy = RetryPolicy::default().with_retryable(|_| true);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), RetryError> = policy
            .run("fragment 1", |_| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(TransportError::Rejected {
                        result: 7,
                        body: String::new(),
                    })
                }
            })
            .await;

        assert_eq!(result.unwrap_err().attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let policy = RetryPolicy::single_attempt();
        let result: Result<(), RetryError> = policy
            .run("probe", |_| async { Err(timeout()) })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);
    }
}
