//! Time sources for the impression tracker.
//!
//! The tracker only ever needs "now" as a duration since some fixed epoch, and
//! only ever subtracts two readings. Production code reads the wall clock;
//! tests drive a [`ManualClock`] so the duration math is deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of the current time.
///
/// Implementations must be `Send + Sync` because the clock is read both by
/// reporting threads and by the background evaluation loop.
pub trait Clock: Send + Sync {
    /// Current time as a duration since the clock's epoch.
    fn now(&self) -> Duration;
}

/// Wall clock measured from the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        // A wall clock set before 1970 reads as the epoch itself.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
    }
}

/// Manually driven clock with millisecond resolution.
///
/// Starts at zero and only moves when told to.
///
/// # Example
///
/// ```
/// use impression::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now(), Duration::from_millis(500));
///
/// clock.set(Duration::from_millis(1000));
/// assert_eq!(clock.now(), Duration::from_secs(1));
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading zero.
    pub fn new() -> Self {
        Self {
            millis: AtomicU64::new(0),
        }
    }

    /// Jump to an absolute reading.
    pub fn set(&self, now: Duration) {
        self.millis.store(now.as_millis() as u64, Ordering::SeqCst);
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        self.millis
            .fetch_add(delta.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_manual_clock_starts_at_zero() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advance_accumulates() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(250));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(500));
    }

    #[test]
    fn test_manual_clock_can_move_backwards() {
        let clock = ManualClock::new();
        clock.set(Duration::from_secs(5));
        clock.set(Duration::from_secs(1));
        assert_eq!(clock.now(), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        let clock = SystemClock;
        assert!(clock.now() > Duration::ZERO);
    }

    #[test]
    fn test_trait_object_usage() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        assert_eq!(clock.now(), Duration::ZERO);
    }
}
