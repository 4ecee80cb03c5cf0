//! Monotonic microsecond clock for instrumentation shims that do not capture
//! their own timestamps.

use std::time::Instant;

/// Microseconds since an arbitrary fixed origin. Non-decreasing across calls,
/// never wall-clock adjusted.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current offset from the origin in microseconds.
    pub fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
