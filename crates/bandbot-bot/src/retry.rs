//! Retry combinator.
//!
//! Every retried operation in the process goes through [`retry_async`]: a
//! fixed delay between attempts, an optional retry budget, and a wait that
//! wakes early on shutdown.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use bandbot_risk::ShutdownLatch;
use bandbot_telemetry::Metrics;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `None` retries until shutdown.
    pub max_retries: Option<u32>,
    pub delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn bounded(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: Some(max_retries),
            delay,
        }
    }

    #[must_use]
    pub fn forever(delay: Duration) -> Self {
        Self {
            max_retries: None,
            delay,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E> {
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: E,
    },

    #[error("{operation} abandoned on shutdown")]
    Cancelled { operation: String },
}

impl<E> RetryError<E> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Run `op` until it succeeds, the budget is spent, or shutdown is triggered.
pub async fn retry_async<T, E, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    latch: &ShutdownLatch,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        match op().await {
            Ok(value) => {
                if attempts > 1 {
                    info!(operation, attempts, "Operation recovered after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                let retries_used = attempts - 1;
                if policy.max_retries.is_some_and(|max| retries_used >= max) {
                    warn!(operation, attempts, error = %e, "Retries exhausted");
                    return Err(RetryError::Exhausted {
                        operation: operation.to_string(),
                        attempts,
                        last: e,
                    });
                }

                warn!(
                    operation,
                    attempt = attempts,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                Metrics::retry(operation);

                if !latch.sleep(policy.delay).await {
                    return Err(RetryError::Cancelled {
                        operation: operation.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bandbot_risk::ShutdownReason;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(retries: u32) -> RetryPolicy {
        RetryPolicy::bounded(retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let latch = ShutdownLatch::new();
        let calls = AtomicU32::new(0);

        let result: Result<u32, RetryError<String>> = retry_async(fast(3), "flaky", &latch, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(format!("attempt {n} failed"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_is_one_plus_retries() {
        let latch = ShutdownLatch::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), RetryError<&str>> = retry_async(fast(3), "down", &latch, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("unreachable host") }
        })
        .await;

        match result {
            Err(RetryError::Exhausted { attempts, last, .. }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last, "unreachable host");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let latch = ShutdownLatch::new();
        let result: Result<(), RetryError<&str>> =
            retry_async(fast(0), "once", &latch, || async { Err("no") }).await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 1, .. })));
    }

    #[tokio::test]
    async fn test_forever_stops_on_shutdown() {
        let latch = Arc::new(ShutdownLatch::new());
        let trigger = latch.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            trigger.trigger(ShutdownReason::Interrupted);
        });

        let result: Result<(), RetryError<&str>> = tokio::time::timeout(
            Duration::from_secs(2),
            retry_async(
                RetryPolicy::forever(Duration::from_millis(5)),
                "switch",
                &latch,
                || async { Err("missing") },
            ),
        )
        .await
        .unwrap();

        assert!(result.unwrap_err().is_cancelled());
    }
}
