//! Session classification for the gaze stream.
//!
//! The classifier tracks gaze presence and accumulates statistics for the
//! current reporting window. A window opens on the first sample that arrives
//! while no window is open and stays open until the monitor flushes it.
//!
//! Processing a sample is split in two steps so anomaly lines can be logged
//! before the sample is counted:
//!
//! 1. [`SessionClassifier::validate`] checks the sample against prior state
//!    and corrects that state.
//! 2. [`SessionClassifier::record`] counts the sample into the window.

use crate::core::format::{format_duration, sample_line};
use crate::source::types::{GazeSample, Position};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistics of the window currently being reported.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionWindow {
    pub is_reporting: bool,
    pub start_timestamp: Duration,
    pub last_timestamp: Duration,
    /// Tick clock reading when the last sample arrived
    pub last_tick_count: Duration,
    pub last_position: Position,
    pub new_position_count: u64,
    pub repeat_position_count: u64,
    pub no_position_count: u64,
    pub blink_count: u64,
    pub min_delta: Duration,
    pub max_delta: Duration,
    pub is_first_report_expected: bool,
    pub is_entered: bool,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            is_reporting: false,
            start_timestamp: Duration::ZERO,
            last_timestamp: Duration::ZERO,
            last_tick_count: Duration::ZERO,
            last_position: Position::Absent,
            new_position_count: 0,
            repeat_position_count: 0,
            no_position_count: 0,
            blink_count: 0,
            min_delta: Duration::MAX,
            max_delta: Duration::ZERO,
            is_first_report_expected: false,
            is_entered: false,
        }
    }
}

impl SessionWindow {
    /// Number of samples counted since the window opened.
    pub fn total_points(&self) -> u64 {
        self.new_position_count + self.repeat_position_count + self.no_position_count
    }
}

/// Point-in-time statistics of an open window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub total_points: u64,
    pub new_positions: u64,
    pub repeated_positions: u64,
    pub null_positions: u64,
    pub blinks: u64,
    pub start: Duration,
    pub last_tick: Duration,
    /// Smallest gap between consecutive samples, if two were seen
    pub min_delta: Option<Duration>,
    pub max_delta: Option<Duration>,
}

impl WindowSummary {
    /// Render the summary line stamped with `timestamp`.
    pub fn render(&self, timestamp: &str) -> String {
        format!(
            "{timestamp}\tReported total of {} points, {} repeated positions, {} blinks and {} null positions between {} to {}",
            self.total_points,
            self.repeated_positions,
            self.blinks,
            self.null_positions,
            format_duration(self.start),
            format_duration(self.last_tick),
        )
    }
}

/// How a sample compared to the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleClass {
    New,
    Repeat,
    NoPosition,
}

impl SampleClass {
    fn classify(previous: &Position, current: &Position) -> Self {
        match (previous, current) {
            (_, Position::Absent) => SampleClass::NoPosition,
            (Position::Present(a), Position::Present(b)) if a == b => SampleClass::Repeat,
            (_, Position::Present(_)) => SampleClass::New,
        }
    }
}

/// Result of counting one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleOutcome {
    pub class: SampleClass,
    /// This sample opened a new window
    pub window_started: bool,
    pub blink: bool,
}

/// Stream-consistency problems detected while validating a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Anomaly {
    ReportWithoutEnter,
    InconsistentFirstReport(GazeSample),
    TimestampWentBackwards(GazeSample),
}

impl Anomaly {
    /// Render the activity log message for this anomaly.
    pub fn message(&self) -> String {
        match self {
            Anomaly::ReportWithoutEnter => "Gaze report without enter".to_string(),
            Anomaly::InconsistentFirstReport(sample) => {
                sample_line("First report after enter is inconsistent", sample)
            }
            Anomaly::TimestampWentBackwards(sample) => {
                sample_line("Report timestamp went backwards", sample)
            }
        }
    }
}

/// Tracks gaze presence and the statistics of the open window.
#[derive(Debug, Default)]
pub struct SessionClassifier {
    window: SessionWindow,
}

impl SessionClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> &SessionWindow {
        &self.window
    }

    pub fn is_reporting(&self) -> bool {
        self.window.is_reporting
    }

    pub fn is_entered(&self) -> bool {
        self.window.is_entered
    }

    /// Handle a gaze-enter and return the message to log.
    pub fn enter(&mut self, sample: &GazeSample) -> String {
        self.window.last_position = sample.position;
        let message = if self.window.is_entered {
            "Enter while already entered"
        } else {
            "Gaze entered"
        };
        self.window.is_entered = true;
        self.window.is_first_report_expected = true;
        sample_line(message, sample)
    }

    /// Handle a gaze-exit and return the message to log.
    pub fn exit(&mut self, sample: &GazeSample) -> String {
        let message = if self.window.is_entered {
            "Gaze exited"
        } else {
            "Unexpected gaze exit without prior enter"
        };
        self.window.is_entered = false;
        sample_line(message, sample)
    }

    /// Check a sample against prior state before it is recorded.
    ///
    /// Returns the anomaly to log, if any. Must be followed by [`record`]
    /// for the same sample once the anomaly has been logged.
    ///
    /// [`record`]: SessionClassifier::record
    pub fn validate(&mut self, sample: &GazeSample) -> Option<Anomaly> {
        let window = &mut self.window;

        if window.is_reporting {
            if sample.timestamp < window.last_timestamp {
                return Some(Anomaly::TimestampWentBackwards(*sample));
            }
            return None;
        }

        if !window.is_entered {
            window.is_entered = true;
            Some(Anomaly::ReportWithoutEnter)
        } else if window.is_first_report_expected && window.last_position != sample.position {
            Some(Anomaly::InconsistentFirstReport(*sample))
        } else {
            None
        }
    }

    /// Count a sample into the window, opening one if none is open.
    ///
    /// `now` is the tick clock reading at arrival.
    pub fn record(&mut self, sample: &GazeSample, now: Duration) -> SampleOutcome {
        let window = &mut self.window;

        let outcome = if !window.is_reporting {
            window.start_timestamp = sample.timestamp;
            window.is_first_report_expected = false;

            let class = if sample.position.is_present() {
                SampleClass::New
            } else {
                SampleClass::NoPosition
            };
            window.new_position_count = u64::from(class == SampleClass::New);
            window.no_position_count = u64::from(class == SampleClass::NoPosition);
            window.repeat_position_count = 0;
            window.blink_count = 0;
            window.min_delta = Duration::MAX;
            window.max_delta = Duration::ZERO;
            window.is_reporting = true;

            SampleOutcome {
                class,
                window_started: true,
                blink: false,
            }
        } else {
            let mut blink = false;
            if let Some(delta) = sample.timestamp.checked_sub(window.last_timestamp) {
                window.min_delta = window.min_delta.min(delta);
                window.max_delta = window.max_delta.max(delta);

                // A gap over twice the smallest one seen is a dropout.
                if window.min_delta.saturating_mul(2) < delta {
                    window.blink_count += 1;
                    blink = true;
                }
            }

            let class = SampleClass::classify(&window.last_position, &sample.position);
            match class {
                SampleClass::New => window.new_position_count += 1,
                SampleClass::Repeat => window.repeat_position_count += 1,
                SampleClass::NoPosition => window.no_position_count += 1,
            }

            SampleOutcome {
                class,
                window_started: false,
                blink,
            }
        };

        window.last_position = sample.position;
        window.last_timestamp = sample.timestamp;
        window.last_tick_count = now;

        outcome
    }

    /// Snapshot the open window, or `None` when nothing is being reported.
    pub fn summary(&self) -> Option<WindowSummary> {
        let window = &self.window;
        if !window.is_reporting {
            return None;
        }

        let seen_delta = window.min_delta != Duration::MAX;
        Some(WindowSummary {
            total_points: window.total_points(),
            new_positions: window.new_position_count,
            repeated_positions: window.repeat_position_count,
            null_positions: window.no_position_count,
            blinks: window.blink_count,
            start: window.start_timestamp,
            last_tick: window.last_tick_count,
            min_delta: seen_delta.then_some(window.min_delta),
            max_delta: seen_delta.then_some(window.max_delta),
        })
    }

    /// Close the open window. The next sample starts a new one.
    pub fn close_window(&mut self) {
        self.window.is_reporting = false;
    }

    /// Tick clock reading of the most recent sample.
    pub fn last_tick_count(&self) -> Duration {
        self.window.last_tick_count
    }
}
