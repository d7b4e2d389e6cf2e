//! Fragment transport seam
//!
//! A [`FragmentTransport`] performs exactly one network call per invocation.
//! Retrying is never its business: [`send_fragment`] and [`finalize`] wrap
//! it in a [`RetryPolicy`] so video fragments and cover images share one
//! code path.

use async_trait::async_trait;

use crate::app::models::Fragment;
use crate::app::retry::{Attempt, RetryPolicy};
use crate::errors::{RetryError, TransportResult};

/// Upload host operations
#[async_trait]
pub trait FragmentTransport: Send + Sync {
    /// Send one fragment; `Ok` only when the server acknowledged it
    async fn send_fragment(
        &self,
        token: &str,
        fragment: &Fragment,
        attempt: Attempt,
    ) -> TransportResult<()>;

    /// Finalize a transfer of `fragment_count` fragments
    async fn complete(
        &self,
        token: &str,
        fragment_count: u64,
        attempt: Attempt,
    ) -> TransportResult<()>;
}

/// Deliver `fragment` under `policy`
pub async fn send_fragment(
    transport: &dyn FragmentTransport,
    policy: &RetryPolicy,
    token: &str,
    fragment: &Fragment,
) -> Result<(), RetryError> {
    let operation = format!("fragment {}", fragment.index + 1);
    policy
        .run(&operation, move |attempt| {
            transport.send_fragment(token, fragment, attempt)
        })
        .await
}

/// Finalize a transfer under `policy`
pub async fn finalize(
    transport: &dyn FragmentTransport,
    policy: &RetryPolicy,
    token: &str,
    fragment_count: u64,
) -> Result<(), RetryError> {
    policy
        .run("finalize transfer", move |attempt| {
            transport.complete(token, fragment_count, attempt)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use bytes::Bytes;

    use crate::errors::{NetworkFailure, TransportError};

    /// Fails the first `failures` calls, recording each attempt context
    struct FlakyTransport {
        failures: u32,
        attempts: Mutex<Vec<Attempt>>,
    }

    #[async_trait]
    impl FragmentTransport for FlakyTransport {
        async fn send_fragment(
            &self,
            _token: &str,
            _fragment: &Fragment,
            attempt: Attempt,
        ) -> TransportResult<()> {
            self.attempts.lock().unwrap().push(attempt);
            if attempt.number <= self.failures {
                Err(TransportError::Network {
                    kind: NetworkFailure::Connect,
                    message: "certificate verify failed".to_string(),
                })
            } else {
                Ok(())
            }
        }

        async fn complete(
            &self,
            _token: &str,
            _fragment_count: u64,
            attempt: Attempt,
        ) -> TransportResult<()> {
            self.attempts.lock().unwrap().push(attempt);
            Err(TransportError::Status { status: 502 })
        }
    }

    fn fragment() -> Fragment {
        Fragment {
            index: 0,
            offset: 0,
            length: 3,
            payload: Bytes::from_static(b"abc"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_insecure_retry_passed_to_transport() {
        let transport = FlakyTransport {
            failures: 2,
            attempts: Mutex::new(Vec::new()),
        };
        let policy = RetryPolicy::new(3, Duration::from_millis(10)).with_insecure_retry(true);

        send_fragment(&transport, &policy, "tok", &fragment())
            .await
            .unwrap();

        let attempts = transport.attempts.lock().unwrap();
        let verify: Vec<bool> = attempts.iter().map(|a| a.verify_tls).collect();
        assert_eq!(verify, vec![true, false, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finalize_exhausts_policy() {
        let transport = FlakyTransport {
            failures: 0,
            attempts: Mutex::new(Vec::new()),
        };
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let err = finalize(&transport, &policy, "tok", 3).await.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert_eq!(err.operation, "finalize transfer");
        assert!(transport
            .attempts
            .lock()
            .unwrap()
            .iter()
            .all(|a| a.verify_tls));
    }
}
