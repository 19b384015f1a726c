//! Time source for expiry decisions
//!
//! Token expiry, cache-entry expiry and revocation expiry are all measured
//! against a [`Clock`], so a single [`ManualClock`] can move every one of them
//! forward together.

use std::sync::Arc;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};

/// Source of the current instant
pub trait Clock: Send + Sync {
    /// The current instant
    fn now(&self) -> DateTime<Utc>;

    /// Current time as whole seconds since the Unix epoch, as used by JWT claims
    fn unix_seconds(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared handle to the default system clock
pub fn system_clock() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to
///
/// Cloning yields a handle to the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Start at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Start at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_all_handles() {
        let clock = ManualClock::starting_now();
        let handle = clock.clone();
        let start = clock.now();

        handle.advance(Duration::milliseconds(1500));

        assert_eq!(clock.now() - start, Duration::milliseconds(1500));
    }

    #[test]
    fn test_unix_seconds_truncates() {
        let start = DateTime::from_timestamp(1_700_000_000, 900_000_000).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.unix_seconds(), 1_700_000_000);
    }
}
