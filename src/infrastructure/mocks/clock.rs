//! Mock clock for testing.

use crate::application::ports::Clock;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of window expiry and document timestamps.
///
/// # Examples
///
/// ```
/// use doc_throttle::infrastructure::mocks::MockClock;
/// use doc_throttle::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::default();
/// let start = clock.now();
///
/// clock.advance(Duration::from_secs(10));
/// assert_eq!(clock.now(), start + chrono::Duration::seconds(10));
/// ```
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned to share across threads.
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific time.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let step = chrono::Duration::from_std(duration)
            .expect("MockClock cannot advance by more than chrono's range");
        let mut time = self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += step;
    }

    /// Set the clock to a specific time.
    pub fn set(&self, time: DateTime<Utc>) {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock") = time;
    }
}

impl Default for MockClock {
    /// Starts at 2024-01-01T00:00:00Z.
    fn default() -> Self {
        Self::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}
