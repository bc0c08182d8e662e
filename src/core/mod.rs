//! Core functionality for the Gaze Stack Watcher.
//!
//! This module contains:
//! - Session classification of gaze samples into reporting windows
//! - Device registry for tracker lifecycle events
//! - Periodic reporter cadence and input-pause detection
//! - The monitor that ties them to the log sink

pub mod clock;
pub mod format;
pub mod monitor;
pub mod registry;
pub mod reporter;
pub mod session;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use monitor::{GazeMonitor, RunEnd};
pub use registry::{DeviceRegistry, SampleHookup};
pub use reporter::PeriodicReporter;
pub use session::{
    Anomaly, SampleClass, SampleOutcome, SessionClassifier, SessionWindow, WindowSummary,
};
