//! Trailing edge throttle for deferred work.
//!
//! Requests are never executed by the throttle itself. The owner submits them
//! with [`Throttle::request`] and drains them with [`Throttle::poll`] on every
//! turn of its loop. At most one request is released per interval; a request
//! made while another is pending replaces it, so the most recent one always
//! runs once the interval has passed.

use std::time::Duration;
use web_time::Instant;

#[derive(Debug)]
pub struct Throttle<T> {
    interval: Duration,
    last_run: Option<Instant>,
    pending: Option<T>,
}

impl<T> Throttle<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            pending: None,
        }
    }

    /// Submit a request, dropping any request still waiting
    pub fn request(&mut self, value: T) {
        if self.pending.replace(value).is_some() {
            log::trace!("Throttle: coalesced pending request");
        }
    }

    /// Release the pending request if the interval since the last release
    /// has passed
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if !self.is_ready(now) {
            return None;
        }
        let value = self.pending.take()?;
        self.last_run = Some(now);
        Some(value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending request without running it
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    fn is_ready(&self, now: Instant) -> bool {
        self.last_run
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn test_first_request_released_immediately() {
        let mut throttle = Throttle::new(INTERVAL);
        let now = Instant::now();
        assert_eq!(throttle.poll(now), None);

        throttle.request(1);
        assert_eq!(throttle.poll(now), Some(1));
        assert!(!throttle.is_pending());
    }

    #[test]
    fn test_requests_within_window_coalesce_to_last() {
        let mut throttle = Throttle::new(INTERVAL);
        let start = Instant::now();
        throttle.request(1);
        assert_eq!(throttle.poll(start), Some(1));

        throttle.request(2);
        throttle.request(3);
        throttle.request(4);
        assert_eq!(throttle.poll(start + Duration::from_millis(40)), None);
        assert_eq!(throttle.poll(start + Duration::from_millis(99)), None);
        assert_eq!(throttle.poll(start + INTERVAL), Some(4));
        assert_eq!(throttle.poll(start + Duration::from_millis(500)), None);
    }

    #[test]
    fn test_at_most_one_release_per_interval() {
        let mut throttle = Throttle::new(INTERVAL);
        let start = Instant::now();
        let mut released = Vec::new();

        for step in 0..30u64 {
            let now = start + Duration::from_millis(step * 10);
            throttle.request(step);
            released.extend(throttle.poll(now).map(|value| (step, value)));
        }

        assert_eq!(
            released,
            vec![(0, 0), (10, 10), (20, 20)],
            "released once per 100ms window"
        );
        assert!(throttle.is_pending());
        assert_eq!(throttle.poll(start + Duration::from_millis(400)), Some(29));
    }

    #[test]
    fn test_cancel_drops_pending() {
        let mut throttle = Throttle::new(INTERVAL);
        throttle.request("stats");
        assert_eq!(throttle.cancel(), Some("stats"));
        assert_eq!(throttle.poll(Instant::now()), None);
    }
}
