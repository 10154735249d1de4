//! Cadence-aligned poll scheduling
//!
//! Wakeups land on the absolute grid `start + k * interval` rather than
//! `previous wakeup + interval`, so a slow poll delays at most its own
//! cycle: the next wakeup is the next grid point and drift does not
//! accumulate across polls.

use std::time::Duration;
use tokio::time::Instant;

/// A fixed wakeup grid anchored at a start instant
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    start: Instant,
    interval: Duration,
}

impl Cadence {
    /// Create a grid starting at `start` with the given interval
    ///
    /// The interval must be non-zero; the harness validates this before a
    /// session starts.
    pub fn new(start: Instant, interval: Duration) -> Self {
        debug_assert!(!interval.is_zero());
        Self { start, interval }
    }

    /// The first grid point strictly after `now`
    pub fn next_wakeup(&self, now: Instant) -> Instant {
        let elapsed_cycles =
            now.duration_since(self.start).as_millis() / self.interval.as_millis();
        self.start + self.interval * (elapsed_cycles as u32 + 1)
    }

    /// Suspend until the next grid point
    ///
    /// If the grid point is already in the past (the caller overran its
    /// cycle), this returns immediately; the grid itself never shifts.
    pub async fn pause(&self) {
        tokio::time::sleep_until(self.next_wakeup(Instant::now())).await;
    }
}
