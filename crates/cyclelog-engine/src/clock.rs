//! Time sources for cycle stamping and pacing.

use std::thread;
use std::time::{Duration, Instant};

/// A monotonic microsecond clock.
///
/// The logger stamps each recorded cycle from it, times its own phases
/// with it, and the runner paces cycles against it. Tests substitute a
/// manually advanced clock so that pacing and timestamps are exact.
pub trait Clock: Send + Sync {
    /// Microseconds since the clock's origin.
    fn now_us(&self) -> i64;

    /// Block until `now_us() >= deadline_us`.
    fn sleep_until(&self, deadline_us: i64) {
        let remaining = deadline_us.saturating_sub(self.now_us());
        if let Ok(us) = u64::try_from(remaining) {
            if us > 0 {
                thread::sleep(Duration::from_micros(us));
            }
        }
    }
}

/// Wall-independent clock measuring from its construction.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    /// A clock whose zero is now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> i64 {
        i64::try_from(self.origin.elapsed().as_micros()).unwrap_or(i64::MAX)
    }
}

/// Microsecond span between two clock readings, clamped at zero.
pub(crate) fn span(start_us: i64, end_us: i64) -> Duration {
    Duration::from_micros(u64::try_from(end_us.saturating_sub(start_us)).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        clock.sleep_until(a + 2_000);
        assert!(clock.now_us() >= a + 2_000);
    }

    #[test]
    fn span_clamps_negative() {
        assert_eq!(span(10, 5), Duration::ZERO);
        assert_eq!(span(5, 10), Duration::from_micros(5));
    }
}
