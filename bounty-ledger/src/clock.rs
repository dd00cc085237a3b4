//! Time source abstraction
//!
//! Every time-dependent decision in the engine (bounty windows, lazy expiry,
//! log timestamps) reads the injected [`Clock`], so tests can drive virtual
//! time instead of sleeping through real bounty windows.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current unix time in seconds
pub trait Clock: Send {
    /// Current unix time in seconds
    fn now(&self) -> i64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually driven clock, shared between a test and the ledger under test
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: i64) -> Self {
        Self(Arc::new(AtomicI64::new(start)))
    }

    /// Move the clock forward by `secs`
    pub fn advance(&self, secs: i64) {
        self.0.fetch_add(secs, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute time
    pub fn set(&self, now: i64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.now(), 100);

        clock.advance(60);
        assert_eq!(clock.now(), 160);

        let shared = clock.clone();
        shared.set(1_000);
        assert_eq!(clock.now(), 1_000);
    }

    #[test]
    fn test_system_clock_is_sane() {
        // Past 2020-01-01, well before the heat death of the universe.
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
