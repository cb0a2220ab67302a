//! Delay between a filter edit and the rebuild it triggers.

use std::time::{Duration, Instant};

/// Fixed-interval debounce. Each request restarts the interval, so a burst
/// of edits results in one rebuild.
#[derive(Debug, Clone)]
pub struct FilterDebounce {
    interval: Duration,
    pending_since: Option<Instant>,
}

impl FilterDebounce {
    /// Debounce with the given interval. A zero interval fires on the next poll.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending_since: None,
        }
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Record an edit made at `now`.
    pub fn request(&mut self, now: Instant) {
        self.pending_since = Some(now);
    }

    /// Whether an edit is waiting.
    pub fn is_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Whether the waiting edit is due at `now`.
    pub fn is_ready(&self, now: Instant) -> bool {
        self.pending_since
            .is_some_and(|since| now.saturating_duration_since(since) >= self.interval)
    }

    /// Consume the waiting edit if it is due.
    pub fn take_ready(&mut self, now: Instant) -> bool {
        let ready = self.is_ready(now);
        if ready {
            self.pending_since = None;
        }
        ready
    }

    /// Drop the waiting edit.
    pub fn cancel(&mut self) {
        self.pending_since = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(150);

    #[test]
    fn fires_once_after_the_interval() {
        let start = Instant::now();
        let mut debounce = FilterDebounce::new(INTERVAL);
        assert!(!debounce.take_ready(start));

        debounce.request(start);
        assert!(!debounce.take_ready(start + Duration::from_millis(100)));
        assert!(debounce.take_ready(start + INTERVAL));
        assert!(!debounce.is_pending());
        assert!(!debounce.take_ready(start + INTERVAL * 2));
    }

    #[test]
    fn new_requests_restart_the_interval() {
        let start = Instant::now();
        let mut debounce = FilterDebounce::new(INTERVAL);
        debounce.request(start);
        debounce.request(start + Duration::from_millis(100));
        assert!(!debounce.is_ready(start + INTERVAL));
        assert!(debounce.is_ready(start + Duration::from_millis(250)));
    }

    #[test]
    fn cancel_drops_the_pending_edit() {
        let start = Instant::now();
        let mut debounce = FilterDebounce::new(Duration::ZERO);
        debounce.request(start);
        debounce.cancel();
        assert!(!debounce.take_ready(start));
    }
}
