//! Time source used to measure request latency.
//!
//! [`RequestLogger`](crate::RequestLogger) reads the clock twice per logged
//! request: once before calling the next handler and once after it returns.
//! Swap in your own [`Clock`] with
//! [`set_clock`](crate::RequestLogger::set_clock) to get deterministic
//! `took` values in tests.

use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;

    /// Time elapsed since `start`, a value previously returned by [`now`](Clock::now).
    fn since(&self, start: Instant) -> Duration;
}

/// The real clock, backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn since(&self, start: Instant) -> Duration {
        start.elapsed()
    }
}
