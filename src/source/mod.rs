//! Gaze input sources for the Gaze Stack Watcher.
//!
//! A source delivers device lifecycle and gaze events on a channel in the
//! order they occurred. The monitor treats that order as authoritative.

pub mod replay;
pub mod simulated;
pub mod types;

use crossbeam_channel::Receiver;

// Re-export commonly used types
pub use replay::{ReplayConfig, ReplaySource};
pub use simulated::{SimulatedSource, SimulationConfig, SyntheticStream};
pub use types::{
    ConfigurationState, DeviceEvent, GazeDevice, GazeEvent, GazeSample, InputEvent, Point,
    Position,
};

/// A producer of input events.
pub trait EventSource {
    /// Begin delivering events on the receiver.
    fn start(&mut self) -> Result<(), SourceError>;

    /// Ask the source to stop delivering events.
    fn stop(&mut self);

    /// Check if the source is still producing events.
    fn is_running(&self) -> bool;

    /// Get the receiver for input events.
    fn receiver(&self) -> &Receiver<InputEvent>;
}

/// Errors that can occur while starting a source.
#[derive(Debug)]
pub enum SourceError {
    AlreadyRunning,
    /// The source was already consumed by an earlier run
    Exhausted,
    Io(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::AlreadyRunning => write!(f, "Source is already running"),
            SourceError::Exhausted => write!(f, "Source has already been consumed"),
            SourceError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}
