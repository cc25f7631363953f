//! Controller-owned deadlines.
//!
//! Nothing here sleeps. The event loop asks the controller for its nearest
//! deadline and wakes it with the current instant.

use std::time::{Duration, Instant};

/// Fires every `interval` until dropped.
#[derive(Debug, Clone)]
pub struct PeriodicTimer {
    interval: Duration,
    next_due: Instant,
}

impl PeriodicTimer {
    pub fn start(now: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next_due: now + interval,
        }
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Returns true (and re-arms) when the deadline has passed. Missed ticks
    /// collapse into one.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        true
    }
}
