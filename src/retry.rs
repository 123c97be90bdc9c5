//! # Apply-with-Retry
//!
//! Repeats a remote call while it fails with an error the caller classifies
//! as retryable, up to a wall-clock budget. Used for scheduled action puts,
//! which fail with "object not found" until a freshly registered scalable
//! target becomes visible to the scaling service.
//!
//! The decision of what to do after a failure is a pure function of the
//! attempt number, the elapsed time and the error ([`RetryPolicy::decide`]);
//! [`RetryPolicy::run`] only sleeps and counts.

use crate::backoff::FibonacciBackoff;
use crate::constants::{
    DEFAULT_PUT_RETRY_TIMEOUT_SECS, DEFAULT_RETRY_BACKOFF_MAX_MS, DEFAULT_RETRY_BACKOFF_MIN_MS,
};
use crate::error::{ReconcileError, RemoteError};
use crate::observability::metrics;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again
    RetryAfter(Duration),
    /// Retryable, but the budget is spent
    Exhausted,
    /// Not retryable; surface immediately
    Fatal,
}

/// Time budget and pacing for retried remote calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    backoff: FibonacciBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_PUT_RETRY_TIMEOUT_SECS),
            FibonacciBackoff::new(
                Duration::from_millis(DEFAULT_RETRY_BACKOFF_MIN_MS),
                Duration::from_millis(DEFAULT_RETRY_BACKOFF_MAX_MS),
            ),
        )
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(timeout: Duration, backoff: FibonacciBackoff) -> Self {
        Self { timeout, backoff }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decide what follows failed attempt number `attempt` (0-based)
    ///
    /// The delay is clamped to the remaining budget so that one last attempt
    /// lands on the deadline rather than after it.
    #[must_use]
    pub fn decide(&self, attempt: u32, elapsed: Duration, retryable: bool) -> RetryDecision {
        if !retryable {
            return RetryDecision::Fatal;
        }
        match self.timeout.checked_sub(elapsed) {
            Some(remaining) if !remaining.is_zero() => {
                RetryDecision::RetryAfter(std::cmp::min(self.backoff.delay(attempt), remaining))
            }
            _ => RetryDecision::Exhausted,
        }
    }

    /// Run `operation` until it succeeds, fails fatally, or the budget runs out
    ///
    /// `kind` labels logs and metrics.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Remote`] for the first non-retryable failure
    /// - [`ReconcileError::RetryTimeout`] carrying the last failure once the budget is spent
    pub async fn run<T, F, Fut, R>(
        &self,
        kind: &'static str,
        is_retryable: R,
        mut operation: F,
    ) -> Result<T, ReconcileError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
        R: Fn(&RemoteError) -> bool,
    {
        let start = tokio::time::Instant::now();
        let mut attempt: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let elapsed = start.elapsed();
            match self.decide(attempt, elapsed, is_retryable(&err)) {
                RetryDecision::Fatal => return Err(err.into()),
                RetryDecision::Exhausted => {
                    warn!(
                        resource.kind = kind,
                        attempts = attempt.saturating_add(1),
                        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retry budget exhausted"
                    );
                    return Err(ReconcileError::RetryTimeout {
                        attempts: attempt.saturating_add(1),
                        elapsed,
                        last: err,
                    });
                }
                RetryDecision::RetryAfter(delay) => {
                    debug!(
                        resource.kind = kind,
                        attempt = attempt.saturating_add(1),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Remote not converged yet, retrying"
                    );
                    metrics::increment_put_retries(kind);
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}
