//! Time management for edge devices
//!
//! The engine needs time for exactly one thing: bounding how long a snapshot
//! guard may be waited on. Clocks are abstracted so the same wait loop runs
//! on a hardware tick counter, on `std::time::Instant`, or on a scripted
//! clock in tests.

use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;

/// Timestamp in milliseconds since an arbitrary epoch (usually boot)
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

/// Convert a wait budget to whole milliseconds, saturating
pub fn budget_ms(budget: Duration) -> u64 {
    u64::try_from(budget.as_millis()).unwrap_or(u64::MAX)
}

/// Monotonic time source backed by `std::time::Instant`
///
/// Starts at 0 when constructed, never goes backwards.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTime {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicTime {
    /// Start a clock at 0 ms
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl TimeSource for MonotonicTime {
    fn now(&self) -> Timestamp {
        budget_ms(self.start.elapsed())
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute time
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Move forward by `ms`
    pub fn advance(&mut self, ms: u64) {
        self.timestamp = self.timestamp.saturating_add(ms);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Clock that advances by a fixed step every time it is read
///
/// Gives bounded-wait loops a deterministic number of iterations without
/// threads or real sleeps. Shareable: reads go through an atomic.
#[derive(Debug)]
pub struct SteppingTime {
    reads: AtomicU32,
    step_ms: u32,
}

impl SteppingTime {
    /// Clock starting at 0 that moves `step_ms` per read
    pub const fn new(step_ms: u32) -> Self {
        Self {
            reads: AtomicU32::new(0),
            step_ms,
        }
    }

    /// Number of times the clock has been read
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl TimeSource for SteppingTime {
    fn now(&self) -> Timestamp {
        let reads = self.reads.fetch_add(1, Ordering::Relaxed);
        u64::from(reads) * u64::from(self.step_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let mut time = FixedTime::new(1000);
        assert_eq!(time.now(), 1000);

        time.advance(500);
        assert_eq!(time.now(), 1500);

        time.set(10);
        assert_eq!(time.now(), 10);
    }

    #[test]
    fn stepping_time_moves_per_read() {
        let time = SteppingTime::new(2);
        assert_eq!(time.now(), 0);
        assert_eq!(time.now(), 2);
        assert_eq!(time.now(), 4);
        assert_eq!(time.reads(), 3);
    }

    #[test]
    fn budget_conversion_saturates() {
        assert_eq!(budget_ms(Duration::from_millis(15)), 15);
        assert_eq!(budget_ms(Duration::from_micros(900)), 0);
        assert_eq!(budget_ms(Duration::MAX), u64::MAX);
    }

    #[cfg(feature = "std")]
    #[test]
    fn monotonic_never_goes_backwards() {
        let clock = MonotonicTime::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
