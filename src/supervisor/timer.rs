//! Instance-owned one-shot deadlines.

use std::time::Duration;
use tokio::time::Instant;

/// A single pending deadline owned by one supervisor.
///
/// The supervisor never sleeps itself; whoever drives it waits until the
/// earliest armed deadline and then asks it to expire due timers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimer {
    deadline: Option<Instant>,
}

impl PhaseTimer {
    /// Arm the timer to fire `window` after `now`, replacing any pending deadline.
    pub fn arm(&mut self, now: Instant, window: Duration) {
        self.deadline = Some(now + window);
    }

    /// Cancel the pending deadline. Returns true if one was pending.
    pub fn clear(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }
}

/// The earlier of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
