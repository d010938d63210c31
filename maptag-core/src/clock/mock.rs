//! Mock clock for testing
//!
//! Time only moves when the test says so.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::Clock;

/// Manually advanced clock
///
/// Starts at the instant it was created and stays there until
/// [`advance`](MockClock::advance) is called.
#[derive(Debug)]
pub struct MockClock {
    now: RwLock<Instant>,
}

impl MockClock {
    /// Create a mock clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            now: RwLock::new(Instant::now()),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        *self.now.write().unwrap() += by;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.read().unwrap()
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
