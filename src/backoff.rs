//! # Fibonacci Backoff
//!
//! Delay between put attempts while waiting for the remote service to
//! converge. Grows more slowly than exponential backoff, which suits an
//! eventual consistency window that is usually a few seconds long.
//!
//! With a 500ms minimum and 10s maximum the sequence is:
//! 0.5s, 0.5s, 1s, 1.5s, 2.5s, 4s, 6.5s, 10s (max), 10s, ...
//!
//! ## Usage
//!
//! ```rust
//! use scaling_reconciler::backoff::FibonacciBackoff;
//! use std::time::Duration;
//!
//! let backoff = FibonacciBackoff::new(Duration::from_millis(500), Duration::from_secs(10));
//! assert_eq!(backoff.delay(0), Duration::from_millis(500));
//! assert_eq!(backoff.delay(2), Duration::from_secs(1));
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Stateless: the delay is a function of the attempt number only, so the
/// retry loop does not need to carry a mutable calculator around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciBackoff {
    /// Unit of the sequence and the first two delays
    min: Duration,
    /// Cap applied to every delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff between `min` and `max`
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (0-based)
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.min.is_zero() {
            return Duration::ZERO;
        }
        let (mut prev, mut current) = (0_u32, 1_u32);
        for _ in 0..attempt {
            let next = prev.saturating_add(current);
            prev = current;
            current = next;
            // Once the multiple exceeds the cap there is no point continuing
            if self.min.saturating_mul(current) >= self.max {
                return self.max;
            }
        }
        std::cmp::min(self.min.saturating_mul(current), self.max)
    }

    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }
}
