//! Wall-clock and monotonic time sources for the session manager.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Calendar time, used for the worklog `started` field.
    fn wall(&self) -> DateTime<Utc>;
    /// Monotonic reading relative to an arbitrary fixed origin.
    fn monotonic(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;
