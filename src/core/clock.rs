//! Time sources used by the monitor.
//!
//! The tick clock is monotonic and drives the reporter cadence and the input
//! pause check. The wall clock only stamps log lines.

use chrono::{DateTime, Local, TimeZone};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock: Send {
    /// Monotonic time since the clock was created.
    fn tick_count(&self) -> Duration;

    /// Local wall-clock time.
    fn wall(&self) -> DateTime<Local>;
}

/// Clock backed by the system.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn tick_count(&self) -> Duration {
        self.origin.elapsed()
    }

    fn wall(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Manually advanced clock for tests and offline replays.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the monitor.
#[derive(Debug, Clone)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
    base: DateTime<Local>,
}

impl ManualClock {
    pub fn new() -> Self {
        let base = Local
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
            .single()
            .unwrap_or_else(Local::now);
        Self {
            micros: Arc::new(AtomicU64::new(0)),
            base,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn tick_count(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn wall(&self) -> DateTime<Local> {
        let offset = chrono::Duration::microseconds(self.micros.load(Ordering::SeqCst) as i64);
        self.base + offset
    }
}
