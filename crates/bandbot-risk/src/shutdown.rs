//! Cooperative shutdown latch.
//!
//! One latch is shared by the orchestration loop and every side worker.
//! Once triggered it stays triggered; the first reason wins. Workers poll
//! [`ShutdownLatch::is_triggered`] at the top of their loop or await
//! [`ShutdownLatch::cancelled`] inside a `tokio::select!` around their sleep,
//! then flush pending work and exit. Nothing is interrupted mid-operation.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// ============================================================================
// ShutdownReason
// ============================================================================

/// Why the process is shutting down.
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    /// The external switch was turned off.
    SwitchOff,
    /// The switch could not be read after bootstrap.
    SwitchUnreadable {
        detail: String,
    },
    /// Too many consecutive cycle failures.
    CycleFailures {
        count: u32,
        last_error: String,
    },
    /// Day rollover could not complete within its retry budget.
    RolloverFailed {
        detail: String,
    },
    /// A side worker exhausted its retry budget.
    WorkerFailed {
        worker: &'static str,
        detail: String,
    },
    /// SIGINT / Ctrl-C.
    Interrupted,
}

impl ShutdownReason {
    /// Fatal reasons are alerted; operator-initiated ones are not.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::SwitchOff | Self::Interrupted)
    }
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwitchOff => write!(f, "Shutdown switch turned off"),
            Self::SwitchUnreadable { detail } => write!(f, "Shutdown switch unreadable: {detail}"),
            Self::CycleFailures { count, last_error } => {
                write!(f, "{count} consecutive cycle failures, last: {last_error}")
            }
            Self::RolloverFailed { detail } => write!(f, "Day rollover failed: {detail}"),
            Self::WorkerFailed { worker, detail } => write!(f, "Worker {worker} failed: {detail}"),
            Self::Interrupted => write!(f, "Interrupted"),
        }
    }
}

// ============================================================================
// ShutdownLatch
// ============================================================================

/// Shared cooperative shutdown flag.
///
/// Thread-safe: share via `Arc<ShutdownLatch>`.
#[derive(Debug, Default)]
pub struct ShutdownLatch {
    token: CancellationToken,
    state: RwLock<Option<(ShutdownReason, DateTime<Utc>)>>,
}

impl ShutdownLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger shutdown. Later calls keep the original reason.
    ///
    /// Returns `true` if this call triggered the latch.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        {
            let mut state = self.state.write();
            if state.is_some() {
                warn!(new_reason = %reason, "Shutdown already triggered, ignoring new reason");
                return false;
            }
            *state = Some((reason.clone(), Utc::now()));
        }

        if reason.is_fatal() {
            error!(reason = %reason, "SHUTDOWN TRIGGERED");
        } else {
            info!(reason = %reason, "Shutdown requested");
        }
        self.token.cancel();
        true
    }

    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        self.state.read().as_ref().map(|(r, _)| r.clone())
    }

    #[must_use]
    pub fn triggered_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().as_ref().map(|(_, at)| *at)
    }

    /// Resolves once the latch is triggered.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `duration` unless shutdown comes first.
    ///
    /// Returns `false` if woken by shutdown.
    pub async fn sleep(&self, duration: std::time::Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.token.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let latch = ShutdownLatch::new();
        assert!(!latch.is_triggered());
        assert!(latch.reason().is_none());

        assert!(latch.trigger(ShutdownReason::SwitchOff));
        assert!(!latch.trigger(ShutdownReason::Interrupted));

        assert!(latch.is_triggered());
        assert_eq!(latch.reason(), Some(ShutdownReason::SwitchOff));
        assert!(latch.triggered_at().is_some());
    }

    #[test]
    fn test_fatal_classification() {
        assert!(!ShutdownReason::SwitchOff.is_fatal());
        assert!(ShutdownReason::CycleFailures {
            count: 4,
            last_error: "timeout".to_string()
        }
        .is_fatal());
    }

    #[tokio::test]
    async fn test_sleep_wakes_on_trigger() {
        let latch = Arc::new(ShutdownLatch::new());
        let waiter = latch.clone();
        let handle = tokio::spawn(async move { waiter.sleep(Duration::from_secs(60)).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        latch.trigger(ShutdownReason::Interrupted);

        let slept_fully = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!slept_fully);
    }

    #[tokio::test]
    async fn test_sleep_completes_without_trigger() {
        let latch = ShutdownLatch::new();
        assert!(latch.sleep(Duration::from_millis(5)).await);
    }
}
