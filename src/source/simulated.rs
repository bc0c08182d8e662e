//! Deterministic synthetic gaze stream for running without hardware.
//!
//! The generated stream attaches one device, enters, then reports samples at
//! roughly 30 Hz along a smooth path. Fixations repeat the previous position,
//! dropouts report no position, blink gaps skip several frames and occasional
//! deliveries batch two samples together.

use crate::source::types::{
    ConfigurationState, DeviceEvent, GazeDevice, GazeEvent, GazeSample, InputEvent, Position,
};
use crate::source::{EventSource, SourceError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const FRAME: Duration = Duration::from_micros(33_333);
const FIXATION_EVERY: u64 = 10;
const DROPOUT_EVERY: u64 = 90;
const DROPOUT_FRAMES: u64 = 3;
const BLINK_EVERY: u64 = 45;
const BLINK_FRAMES: u64 = 6;
const BATCH_EVERY: u64 = 120;

/// Configuration for the simulated stream.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Stream length
    pub duration: Duration,
    /// Sleep between deliveries so the stream runs at wall-clock speed
    pub realtime: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(10),
            realtime: true,
        }
    }
}

/// Event source producing a synthetic gaze stream.
pub struct SimulatedSource {
    config: SimulationConfig,
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
}

impl SimulatedSource {
    pub fn new(config: SimulationConfig) -> Self {
        let (sender, receiver) = bounded(10_000);
        Self {
            config,
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl EventSource for SimulatedSource {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        let sender = self.sender.take().ok_or(SourceError::Exhausted)?;

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let config = self.config.clone();

        thread::Builder::new()
            .name("gaze-simulator".to_string())
            .spawn(move || {
                let mut stream = SyntheticStream::new(config.duration);
                while running.load(Ordering::SeqCst) {
                    let Some(event) = stream.next() else { break };
                    let pause = matches!(event, InputEvent::Gaze(GazeEvent::Moved { .. }));
                    if sender.send(event).is_err() {
                        break;
                    }
                    if config.realtime && pause {
                        thread::sleep(FRAME);
                    }
                }
                debug!("Simulated stream finished");
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| SourceError::Io(e.to_string()))?;

        info!(duration_secs = self.config.duration.as_secs(), "Simulation started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Attach,
    Enumerated,
    Enter,
    Moving,
    Exit,
    Detach,
    Done,
}

/// Iterator over the synthetic event sequence.
pub struct SyntheticStream {
    device: GazeDevice,
    phase: Phase,
    /// Samples produced so far
    index: u64,
    /// Stream time in frames, advanced past blink gaps
    frame: u64,
    total_frames: u64,
    last_position: Position,
}

impl SyntheticStream {
    pub fn new(duration: Duration) -> Self {
        let total_frames = (duration.as_micros() / FRAME.as_micros()) as u64;
        Self {
            device: GazeDevice::new(1, ConfigurationState::Ready),
            phase: Phase::Attach,
            index: 0,
            frame: 0,
            total_frames,
            last_position: Position::Absent,
        }
    }

    fn timestamp(&self) -> Duration {
        FRAME * self.frame as u32
    }

    fn position_for(&self, index: u64, frame: u64) -> Position {
        if index >= DROPOUT_EVERY && index % DROPOUT_EVERY < DROPOUT_FRAMES {
            return Position::Absent;
        }
        if index % FIXATION_EVERY == 1 {
            return self.last_position;
        }
        let t = frame as f64 / 30.0;
        let x = (960.0 + 400.0 * (t * 0.7).sin()).round();
        let y = (540.0 + 250.0 * (t * 1.1).cos()).round();
        Position::at(x, y)
    }

    fn next_sample(&mut self) -> GazeSample {
        let position = self.position_for(self.index, self.frame);
        let sample = GazeSample::new(self.timestamp(), position);
        self.last_position = position;
        self.index += 1;
        self.frame += 1;
        if self.index % BLINK_EVERY == 0 {
            self.frame += BLINK_FRAMES;
        }
        sample
    }
}

impl Iterator for SyntheticStream {
    type Item = InputEvent;

    fn next(&mut self) -> Option<InputEvent> {
        let event = match self.phase {
            Phase::Attach => {
                self.phase = Phase::Enumerated;
                DeviceEvent::Added {
                    device: self.device.clone(),
                }
                .into()
            }
            Phase::Enumerated => {
                self.phase = Phase::Enter;
                DeviceEvent::EnumerationCompleted.into()
            }
            Phase::Enter => {
                self.phase = Phase::Moving;
                let position = self.position_for(0, 0);
                self.last_position = position;
                GazeEvent::Entered {
                    sample: GazeSample::new(Duration::ZERO, position),
                }
                .into()
            }
            Phase::Moving => {
                let mut samples = vec![self.next_sample()];
                if self.index % BATCH_EVERY == 0 {
                    samples.push(self.next_sample());
                }
                if self.frame >= self.total_frames {
                    self.phase = Phase::Exit;
                }
                GazeEvent::Moved { samples }.into()
            }
            Phase::Exit => {
                self.phase = Phase::Detach;
                GazeEvent::Exited {
                    sample: GazeSample::new(self.timestamp(), Position::Absent),
                }
                .into()
            }
            Phase::Detach => {
                self.phase = Phase::Done;
                DeviceEvent::Removed {
                    device: self.device.clone(),
                }
                .into()
            }
            Phase::Done => return None,
        };
        Some(event)
    }
}
