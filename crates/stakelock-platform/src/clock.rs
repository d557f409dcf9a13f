//! Time sources for the platform.

use std::sync::atomic::{AtomicU64, Ordering};

use stakelock_core::traits::Clock;
use stakelock_core::types::Timestamp;

/// Wall-clock time in Unix seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system time reads as 0.
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// Manually driven clock for tests and scenario replay.
///
/// Accepts any value, including one in the past, so callers can exercise
/// the platform's clock-regression guard.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`, saturating at `Timestamp::MAX`. Returns the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let prev = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| Some(t.saturating_add(secs)))
            .unwrap_or_else(|t| t);
        prev.saturating_add(secs)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_set_and_advance() {
        let c = ManualClock::new(100);
        assert_eq!(c.now(), 100);
        assert_eq!(c.advance(50), 150);
        assert_eq!(c.now(), 150);
        c.set(10);
        assert_eq!(c.now(), 10);
    }

    #[test]
    fn manual_clock_advance_saturates() {
        let c = ManualClock::new(Timestamp::MAX - 1);
        assert_eq!(c.advance(10), Timestamp::MAX);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
