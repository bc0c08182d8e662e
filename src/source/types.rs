//! Event types delivered by a gaze input source.
//!
//! Samples carry only a stream-relative timestamp and an optional screen
//! position. Device events describe the lifecycle of attached trackers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A screen position reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Gaze position of a sample, compared by value.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Point>", into = "Option<Point>")]
pub enum Position {
    Present(Point),
    #[default]
    Absent,
}

impl Position {
    pub fn at(x: f64, y: f64) -> Self {
        Position::Present(Point::new(x, y))
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Position::Present(_))
    }
}

impl From<Option<Point>> for Position {
    fn from(point: Option<Point>) -> Self {
        match point {
            Some(p) => Position::Present(p),
            None => Position::Absent,
        }
    }
}

impl From<Position> for Option<Point> {
    fn from(position: Position) -> Self {
        match position {
            Position::Present(p) => Some(p),
            Position::Absent => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Present(p) => write!(f, "{},{}", p.x, p.y),
            Position::Absent => write!(f, "No Position"),
        }
    }
}

/// One reported eye-tracking data point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    /// Time since the start of the stream
    #[serde(rename = "timestamp_us", with = "duration_micros")]
    pub timestamp: Duration,
    /// Screen position, absent when the tracker lost the eyes
    #[serde(default)]
    pub position: Position,
}

impl GazeSample {
    pub fn new(timestamp: Duration, position: Position) -> Self {
        Self {
            timestamp,
            position,
        }
    }

    /// Sample at `millis` into the stream with a present position.
    pub fn at_millis(millis: u64, x: f64, y: f64) -> Self {
        Self::new(Duration::from_millis(millis), Position::at(x, y))
    }

    /// Sample at `millis` into the stream with no position.
    pub fn absent_at_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis), Position::Absent)
    }
}

/// Configuration state reported by a gaze device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationState {
    #[default]
    Unknown,
    Ready,
    Configuring,
    ScreenSetupNeeded,
    UserCalibrationNeeded,
}

impl fmt::Display for ConfigurationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigurationState::Unknown => "Unknown",
            ConfigurationState::Ready => "Ready",
            ConfigurationState::Configuring => "Configuring",
            ConfigurationState::ScreenSetupNeeded => "ScreenSetupNeeded",
            ConfigurationState::UserCalibrationNeeded => "UserCalibrationNeeded",
        };
        f.write_str(name)
    }
}

/// Description of an attached gaze device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GazeDevice {
    pub id: u32,
    #[serde(default)]
    pub configuration_state: ConfigurationState,
    #[serde(default)]
    pub can_track_eyes: bool,
    #[serde(default)]
    pub can_track_head: bool,
}

impl GazeDevice {
    pub fn new(id: u32, configuration_state: ConfigurationState) -> Self {
        Self {
            id,
            configuration_state,
            can_track_eyes: true,
            can_track_head: false,
        }
    }
}

/// Device lifecycle transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DeviceEvent {
    #[serde(rename = "device_added")]
    Added { device: GazeDevice },
    #[serde(rename = "device_updated")]
    Updated { device: GazeDevice },
    #[serde(rename = "device_removed")]
    Removed { device: GazeDevice },
    EnumerationCompleted,
}

/// Gaze presence and movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GazeEvent {
    #[serde(rename = "gaze_entered")]
    Entered { sample: GazeSample },
    /// One delivery may batch several intermediate samples
    #[serde(rename = "gaze_moved")]
    Moved { samples: Vec<GazeSample> },
    #[serde(rename = "gaze_exited")]
    Exited { sample: GazeSample },
}

/// Unified event type for input sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputEvent {
    Device(DeviceEvent),
    Gaze(GazeEvent),
}

impl InputEvent {
    /// Timestamp of the latest sample carried by this event, if any.
    pub fn sample_timestamp(&self) -> Option<Duration> {
        match self {
            InputEvent::Device(_) => None,
            InputEvent::Gaze(GazeEvent::Entered { sample })
            | InputEvent::Gaze(GazeEvent::Exited { sample }) => Some(sample.timestamp),
            InputEvent::Gaze(GazeEvent::Moved { samples }) => {
                samples.last().map(|s| s.timestamp)
            }
        }
    }
}

impl From<DeviceEvent> for InputEvent {
    fn from(event: DeviceEvent) -> Self {
        InputEvent::Device(event)
    }
}

impl From<GazeEvent> for InputEvent {
    fn from(event: GazeEvent) -> Self {
        InputEvent::Gaze(event)
    }
}

/// Serde support for microsecond timestamps.
mod duration_micros {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_micros() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u64::deserialize(deserializer)?;
        Ok(Duration::from_micros(micros))
    }
}
