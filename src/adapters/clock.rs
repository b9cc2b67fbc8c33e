//! Clock adapters.
//!
//! [`SystemClock`] is the real thing: wall-clock reads for ping payload
//! timestamps, a monotonic `Instant` for every deadline comparison.
//! [`FakeClock`] is hand-advanced; tests jump it past backoff deadlines
//! and ping intervals instead of sleeping through them.

use core::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::ports::ClockPort;

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn epoch_secs(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn monotonic_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Manually driven clock. Epoch time is derived from the same counter, so
/// a ping timestamp is predictable in tests.
pub struct FakeClock {
    ms: AtomicU64,
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            ms: AtomicU64::new(0),
        }
    }

    pub fn advance_ms(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::Relaxed);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for FakeClock {
    fn epoch_secs(&self) -> f64 {
        self.ms.load(Ordering::Relaxed) as f64 / 1000.0
    }

    fn monotonic_ms(&self) -> u64 {
        self.ms.load(Ordering::Relaxed)
    }
}
