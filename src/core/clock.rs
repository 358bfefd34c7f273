//! Time sources used by the poll loop.
//!
//! Window boundaries are timed on a monotonic clock so wall-clock steps
//! (NTP corrections, manual changes) cannot stall or repeat a window. Report
//! dates still come from the wall clock.

use chrono::Utc;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of "now" for boundary timing and report dates.
pub trait Clock {
    /// Milliseconds on a clock that never goes backwards. Only differences
    /// are meaningful.
    fn now_ms(&self) -> u64;

    /// Milliseconds since the Unix epoch, used to date reports.
    fn wall_ms(&self) -> u64 {
        self.now_ms()
    }
}

/// The real system clocks: `Instant` for timing, `Utc::now` for dates.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall_ms(&self) -> u64 {
        Utc::now().timestamp_millis().max(0) as u64
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a scripted source set and the loop can
/// observe one simulated timeline. The same value serves as wall time.
#[doc(hidden)]
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get().saturating_add(ms));
    }

    /// Move to `ms`; never goes backwards.
    pub fn set(&self, ms: u64) {
        if ms > self.now.get() {
            self.now.set(ms);
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(1_000);
        let other = clock.clone();
        clock.advance(250);
        assert_eq!(other.now_ms(), 1_250);
        assert_eq!(other.wall_ms(), 1_250);

        other.set(1_100);
        assert_eq!(clock.now_ms(), 1_250);
        other.set(2_000);
        assert_eq!(clock.now_ms(), 2_000);
    }

    #[test]
    fn test_system_clock_wall_time_is_recent() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock::new().wall_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_system_clock_is_monotonic_from_origin() {
        let clock = SystemClock::new();
        let first = clock.now_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = clock.now_ms();
        assert!(first < 1_000);
        assert!(second >= first + 5);
    }
}
