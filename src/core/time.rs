//! Clock abstraction for testable time-dependent logic
//!
//! Queues read "now" through a [`Clock`] so that interval measurements can be
//! driven either by tokio's timer (which honours `tokio::time::pause`) or by a
//! manual clock in tests.

#[cfg(test)]
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::time::Duration;
use tokio::time::Instant;

/// Abstraction over the monotonic clock
pub trait Clock: Send + Sync {
    /// Get the current monotonic time
    fn now(&self) -> Instant;
}

/// Production clock backed by tokio's time driver
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic testing
#[derive(Clone)]
#[cfg(test)]
pub struct ManualClock {
    current: Arc<Mutex<Instant>>,
}

#[cfg(test)]
impl ManualClock {
    /// Create a manual clock starting at the current instant
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap();
        *current += duration;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_starts_frozen() {
        let clock = ManualClock::new();
        let first = clock.now();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(clock.now(), first);
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(3));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(3));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();

        clock.advance(Duration::from_millis(250));

        assert_eq!(clock.now(), other.now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_follows_paused_time() {
        let clock = TokioClock;
        let start = clock.now();

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(clock.now().duration_since(start) >= Duration::from_secs(10));
    }
}
