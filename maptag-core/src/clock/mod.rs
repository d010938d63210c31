//! Time sources for cache expiry
//!
//! The enrichment engine never sleeps or schedules anything; it only asks a
//! [`Clock`] for "now" at the start of each batch. Swapping the clock lets
//! tests move time forward without waiting.
//!
//! - `SystemClock`: monotonic wall time via `Instant::now()`
//! - `MockClock`: manually advanced, for tests

mod mock;

pub use mock::MockClock;

use std::time::Instant;

/// Abstract monotonic time source
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Clock name (for logging)
    fn name(&self) -> &'static str;
}

/// Clock backed by the operating system's monotonic timer
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a system clock
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn name(&self) -> &'static str {
        "system"
    }
}
