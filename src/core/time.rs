//! Time sources for the scheduling tick

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::types::duration_us;

/// Source of monotonic time.
///
/// The terrain reads time only through this trait so that phase timings and the
/// commit budget can be driven deterministically in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually driven clock.
///
/// Time only moves through [`ManualClock::advance`], or by a fixed step after
/// every call to [`Clock::now`] when built with [`ManualClock::with_step`].
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_us: AtomicU64,
    step_us: AtomicU64,
}

impl ManualClock {
    /// Create a clock frozen at its creation instant
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_us: AtomicU64::new(0),
            step_us: AtomicU64::new(0),
        }
    }

    /// Create a clock that moves forward by `step` after each reading
    pub fn with_step(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_step(step);
        clock
    }

    /// Change the auto-advance step (zero disables it)
    pub fn set_step(&self, step: Duration) {
        self.step_us.store(duration_us(step), Ordering::Relaxed);
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.offset_us.fetch_add(duration_us(by), Ordering::Relaxed);
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        Duration::from_micros(self.offset_us.load(Ordering::Relaxed))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let step = self.step_us.load(Ordering::Relaxed);
        let offset = self.offset_us.fetch_add(step, Ordering::Relaxed);
        self.base + Duration::from_micros(offset)
    }
}
