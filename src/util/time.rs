//! Timing utilities
//!
//! Workers stamp their start and end with a shared monotonic clock so that
//! per-worker intervals can be merged into one aggregate interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of monotonic timestamps in nanoseconds
///
/// One clock instance is shared by all workers of a run.
pub trait Clock: Send + Sync {
    /// Nanoseconds since the clock's origin
    fn now_ns(&self) -> u64;

    /// Block the calling thread for `duration`
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Monotonic clock measuring from a fixed `Instant` origin
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
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Clock advanced by hand, for tests that need exact timestamps
///
/// `sleep` returns at once, moving the clock forward by the requested time.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
    step: u64,
    sleeps: AtomicU64,
}

impl ManualClock {
    /// Clock starting at `start` that advances by `step` ns after every read
    pub fn new(start: u64, step: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
            step,
            sleeps: AtomicU64::new(0),
        }
    }

    pub fn set(&self, ns: u64) {
        self.now.store(ns, Ordering::SeqCst);
    }

    /// Number of `sleep` calls so far
    pub fn sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::SeqCst)
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.now.fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

/// Convert a nanosecond interval to seconds
#[inline]
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_monotonic_clock_advances() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        thread::sleep(Duration::from_millis(5));
        let b = clock.now_ns();
        assert!(b >= a + 5_000_000);
    }

    #[test]
    fn test_copies_share_origin() {
        let clock = MonotonicClock::new();
        let copy = clock;
        thread::sleep(Duration::from_millis(1));
        let a = clock.now_ns();
        let b = copy.now_ns();
        // Same origin: readings taken back to back are close together
        assert!(b >= a && b - a < 50_000_000);
    }

    #[test]
    fn test_manual_clock_steps() {
        let clock = ManualClock::new(100, 10);
        assert_eq!(clock.now_ns(), 100);
        assert_eq!(clock.now_ns(), 110);
        clock.set(5);
        assert_eq!(clock.now_ns(), 5);
    }

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::new(0, 0);
        clock.sleep(Duration::from_micros(250));
        clock.sleep(Duration::from_micros(250));
        assert_eq!(clock.sleeps(), 2);
        assert_eq!(clock.now_ns(), 500_000);
    }

    #[test]
    fn test_ns_to_secs() {
        assert_eq!(ns_to_secs(2_500_000_000), 2.5);
    }
}
