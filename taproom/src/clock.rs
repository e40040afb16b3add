//! Time sources for expiry checks
//!
//! The `exp` and `iat` claims are Unix timestamps. Validation asks a
//! [`Clock`] for the current time instead of reading the system directly,
//! so tests can pin time wherever a scenario needs it and never sleep.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Whole seconds since 1970-01-01T00:00:00Z
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct UnixTime(pub u64);

/// A source of the current Unix time
pub trait Clock {
    /// The current time according to this source
    fn now(&self) -> UnixTime;
}

/// The process-wide system clock
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct System;

impl Clock for System {
    fn now(&self) -> UnixTime {
        // A system clock set before the epoch reads as zero.
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();

        UnixTime(elapsed.as_secs())
    }
}

/// A clock pinned to a fixed instant, for tests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestClock(UnixTime);

impl TestClock {
    /// A clock that always reports `time`
    #[inline]
    pub const fn new(time: UnixTime) -> Self {
        Self(time)
    }

    /// Moves the clock to `time`
    pub fn set(&mut self, time: UnixTime) {
        self.0 = time;
    }
}

impl Clock for TestClock {
    #[inline]
    fn now(&self) -> UnixTime {
        self.0
    }
}
