//! Time source for last-activity tracking

use std::time::Instant;

/// Monotonic time source
///
/// The session only compares instants it obtained from the same clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Clock backed by `std::time::Instant::now`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
