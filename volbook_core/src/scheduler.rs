//! # Save Scheduler
//!
//! Debounced persistence timing as an explicit, owned object.
//!
//! The data-entry surface recomputes and wants to persist on every keystroke;
//! writing the file that often is wasteful. `SaveScheduler` coalesces a burst
//! of edits into one save: each [`schedule`](SaveScheduler::schedule) replaces
//! the pending payload and restarts a quiet period, and the payload is only
//! handed back once the quiet period has elapsed (or on
//! [`flush`](SaveScheduler::flush)).
//!
//! The scheduler owns no I/O and no threads: it is a passive timer the caller
//! polls, with the clock injected so persistence timing is independently
//! testable.
//!
//! ## Example
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use volbook_core::scheduler::SaveScheduler;
//!
//! let mut scheduler: SaveScheduler<String> = SaveScheduler::new(Duration::from_millis(300));
//!
//! let start = Instant::now();
//! scheduler.schedule_at(start, "draft 1".to_string());
//! scheduler.schedule_at(start + Duration::from_millis(100), "draft 2".to_string());
//!
//! // Still inside the quiet period: nothing due yet
//! assert!(scheduler.take_due(start + Duration::from_millis(200)).is_none());
//!
//! // Quiet period elapsed since the LAST schedule: the latest payload wins
//! let due = scheduler.take_due(start + Duration::from_millis(450));
//! assert_eq!(due.as_deref(), Some("draft 2"));
//! ```

use std::time::{Duration, Instant};

/// Default quiet period between the last edit and the save.
pub const DEFAULT_SAVE_DELAY: Duration = Duration::from_millis(300);

/// Debounce scheduler holding at most one pending payload.
#[derive(Debug)]
pub struct SaveScheduler<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> SaveScheduler<T> {
    /// Create a scheduler with the given quiet period.
    pub fn new(delay: Duration) -> Self {
        SaveScheduler {
            delay,
            pending: None,
        }
    }

    /// Schedule a payload, replacing any pending one and restarting the
    /// quiet period from now.
    pub fn schedule(&mut self, payload: T) {
        self.schedule_at(Instant::now(), payload);
    }

    /// Schedule a payload with an explicit clock reading.
    pub fn schedule_at(&mut self, now: Instant, payload: T) {
        self.pending = Some((now, payload));
    }

    /// Take the pending payload if its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((scheduled, _)) if now.duration_since(*scheduled) >= self.delay => {
                self.pending.take().map(|(_, payload)| payload)
            }
            _ => None,
        }
    }

    /// Take the pending payload using the current time.
    pub fn poll(&mut self) -> Option<T> {
        self.take_due(Instant::now())
    }

    /// Take the pending payload immediately, quiet period or not.
    ///
    /// Call on shutdown so the last edits are never lost.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, payload)| payload)
    }

    /// Whether a payload is waiting to be saved.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The configured quiet period.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Default for SaveScheduler<T> {
    fn default() -> Self {
        SaveScheduler::new(DEFAULT_SAVE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_due_before_quiet_period() {
        let mut s: SaveScheduler<u32> = SaveScheduler::new(Duration::from_millis(300));
        let start = Instant::now();
        s.schedule_at(start, 1);
        assert!(s.is_pending());
        assert!(s.take_due(start + Duration::from_millis(299)).is_none());
        assert!(s.is_pending());
    }

    #[test]
    fn test_due_after_quiet_period() {
        let mut s: SaveScheduler<u32> = SaveScheduler::new(Duration::from_millis(300));
        let start = Instant::now();
        s.schedule_at(start, 7);
        assert_eq!(s.take_due(start + Duration::from_millis(300)), Some(7));
        assert!(!s.is_pending());
        // Taking again yields nothing
        assert!(s.take_due(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_reschedule_restarts_quiet_period_and_coalesces() {
        let mut s: SaveScheduler<&str> = SaveScheduler::new(Duration::from_millis(300));
        let start = Instant::now();
        s.schedule_at(start, "first");
        s.schedule_at(start + Duration::from_millis(200), "second");

        // 300ms after the FIRST schedule, but only 100ms after the second
        assert!(s.take_due(start + Duration::from_millis(300)).is_none());

        // Latest payload wins once quiet
        assert_eq!(
            s.take_due(start + Duration::from_millis(500)),
            Some("second")
        );
    }

    #[test]
    fn test_flush_returns_pending_immediately() {
        let mut s: SaveScheduler<u32> = SaveScheduler::new(Duration::from_secs(60));
        s.schedule(42);
        assert_eq!(s.flush(), Some(42));
        assert_eq!(s.flush(), None);
    }
}
