//! # Clock
//!
//! Deadlines and cooldowns are evaluated against a [`Clock`] so tests and
//! simulations can drive time explicitly. Each engine operation reads the
//! clock once and uses that instant throughout.

use std::sync::Arc;

use parking_lot::Mutex;
use truce_core::{Timestamp, TruceError};

/// Source of the current time.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// A clock stopped at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// A clock stopped at `secs` since the Unix epoch.
    pub fn at_epoch_secs(secs: i64) -> Result<Self, TruceError> {
        Ok(Self::new(Timestamp::from_epoch_secs(secs)?))
    }

    /// Move forward by `secs`.
    pub fn advance(&self, secs: u64) -> Result<Timestamp, TruceError> {
        let mut now = self.now.lock();
        *now = now.checked_add_secs(secs)?;
        Ok(*now)
    }

    /// Jump to `at`. Moving backwards is permitted.
    pub fn set(&self, at: Timestamp) {
        *self.now.lock() = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
