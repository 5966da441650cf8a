//! Time sources for entry timestamps.
//!
//! The cache never reads the system clock directly. All timestamps come
//! from a [`Clock`] capability injected at construction, so tests can
//! drive time explicitly with [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Source of millisecond timestamps.
///
/// Implementations must be monotonically non-decreasing: two successive
/// calls may return the same value, never a smaller one. Implementations
/// must not block; they are invoked while the cache lock is held.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Wall-clock [`Clock`].
///
/// The raw wall clock can step backwards (NTP corrections, manual
/// adjustment); a high-water mark clamps the output so it never
/// decreases.
#[derive(Debug, Default)]
pub struct SystemClock {
    high_water: AtomicI64,
}

impl SystemClock {
    /// Create a wall-clock time source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let seen = self.high_water.fetch_max(wall, Ordering::AcqRel);
        wall.max(seen)
    }
}

/// Deterministic [`Clock`] for tests; advances only when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start` milliseconds.
    pub fn new(start: i64) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward by a duration.
    pub fn advance(&self, by: Duration) {
        self.advance_millis(by.as_millis() as i64);
    }

    /// Move the clock forward by `millis`.
    pub fn advance_millis(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::AcqRel);
    }

    /// Jump the clock to an absolute reading. Values below the current
    /// reading are ignored; the clock never runs backwards.
    pub fn set(&self, millis: i64) {
        self.now.fetch_max(millis, Ordering::AcqRel);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_never_decreases() {
        let clock = SystemClock::new();
        let mut last = clock.now_millis();
        for _ in 0..1_000 {
            let now = clock.now_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_manual_clock_starts_where_told() {
        let clock = ManualClock::new(42);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance_millis(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_millis(), 1_750);
    }

    #[test]
    fn test_manual_clock_set_ignores_backwards_jumps() {
        let clock = ManualClock::new(1_000);
        clock.set(2_000);
        assert_eq!(clock.now_millis(), 2_000);
        clock.set(500);
        assert_eq!(clock.now_millis(), 2_000);
    }
}
