//! Periodic reporter cadence and input-pause detection.
//!
//! The reporter does not render anything itself. The monitor polls it with
//! the tick clock and, when a tick is due, refreshes the preview line from a
//! fresh [`WindowSummary`](crate::core::session::WindowSummary).

use std::time::Duration;

/// Default interval between preview refreshes.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Default silence after which the stream is considered paused.
pub const DEFAULT_INPUT_PAUSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Timer and preview state for the open window.
#[derive(Debug, Clone)]
pub struct PeriodicReporter {
    interval: Duration,
    pause_timeout: Duration,
    next_due: Option<Duration>,
    preview_shown: bool,
}

impl PeriodicReporter {
    pub fn new(interval: Duration, pause_timeout: Duration) -> Self {
        Self {
            interval,
            pause_timeout,
            next_due: None,
            preview_shown: false,
        }
    }

    pub fn pause_timeout(&self) -> Duration {
        self.pause_timeout
    }

    /// Start ticking; the first tick is due one interval after `now`.
    pub fn start(&mut self, now: Duration) {
        self.next_due = Some(now + self.interval);
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    /// Return true when a tick is due at `now` and schedule the next one.
    ///
    /// Missed ticks are not replayed; the next tick is one interval from now.
    pub fn poll(&mut self, now: Duration) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }

    pub fn is_preview_shown(&self) -> bool {
        self.preview_shown
    }

    pub fn mark_preview_shown(&mut self) {
        self.preview_shown = true;
    }

    /// Clear the preview flag, returning whether a preview was shown.
    pub fn take_preview(&mut self) -> bool {
        std::mem::take(&mut self.preview_shown)
    }

    /// Whether the last sample arrived longer than the pause timeout ago.
    pub fn is_input_paused(&self, last_tick_count: Duration, now: Duration) -> bool {
        match now.checked_sub(self.pause_timeout) {
            Some(threshold) => last_tick_count < threshold,
            None => false,
        }
    }
}

impl Default for PeriodicReporter {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_INTERVAL, DEFAULT_INPUT_PAUSE_TIMEOUT)
    }
}
