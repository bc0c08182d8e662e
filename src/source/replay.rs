//! Replays a recorded JSON-lines event stream.
//!
//! Each non-empty line holds one [`InputEvent`]. Lines starting with `#` are
//! comments. Events are pushed into a bounded channel from a background
//! thread; the channel disconnects when the recording is exhausted.

use crate::source::types::InputEvent;
use crate::source::{EventSource, SourceError};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Configuration for a replay source.
#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    /// Pace delivery by sample timestamps instead of replaying as fast as possible
    pub realtime: bool,
}

type Reader = Box<dyn BufRead + Send>;

/// Event source backed by a recorded stream.
pub struct ReplaySource {
    config: ReplayConfig,
    reader: Option<Reader>,
    sender: Option<Sender<InputEvent>>,
    receiver: Receiver<InputEvent>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Create a replay source over any buffered reader.
    pub fn from_reader(reader: impl BufRead + Send + 'static, config: ReplayConfig) -> Self {
        let (sender, receiver) = bounded(10_000);
        Self {
            config,
            reader: Some(Box::new(reader)),
            sender: Some(sender),
            receiver,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Create a replay source reading a recording file, or stdin for `-`.
    pub fn from_path(path: &Path, config: ReplayConfig) -> Result<Self, SourceError> {
        if path == Path::new("-") {
            let stdin = BufReader::new(std::io::stdin());
            return Ok(Self::from_reader(stdin, config));
        }

        let file = File::open(path)
            .map_err(|e| SourceError::Io(format!("{}: {e}", path.display())))?;
        Ok(Self::from_reader(BufReader::new(file), config))
    }
}

impl EventSource for ReplaySource {
    fn start(&mut self) -> Result<(), SourceError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SourceError::AlreadyRunning);
        }
        let (reader, sender) = match (self.reader.take(), self.sender.take()) {
            (Some(reader), Some(sender)) => (reader, sender),
            _ => return Err(SourceError::Exhausted),
        };

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let realtime = self.config.realtime;

        let worker = thread::Builder::new()
            .name("gaze-replay".to_string())
            .spawn(move || replay_lines(reader, sender, running, realtime))
            .map_err(|e| SourceError::Io(e.to_string()))?;
        self.worker = Some(worker);

        info!(realtime, "Replay started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            // The worker may be parked on a full channel; it exits once the
            // receiver is dropped, so only join when it already finished.
            if worker.is_finished() {
                let _ = worker.join();
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn receiver(&self) -> &Receiver<InputEvent> {
        &self.receiver
    }
}

fn replay_lines(
    reader: Reader,
    sender: Sender<InputEvent>,
    running: Arc<AtomicBool>,
    realtime: bool,
) {
    let mut pacer = realtime.then(Pacer::default);
    let mut delivered = 0u64;

    for (index, line) in reader.lines().enumerate() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(line = index + 1, "Replay read failed: {e}");
                break;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: InputEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                warn!(line = index + 1, "Skipping unparseable event: {e}");
                continue;
            }
        };

        if let (Some(pacer), Some(timestamp)) = (pacer.as_mut(), event.sample_timestamp()) {
            pacer.wait_for(timestamp);
        }

        if sender.send(event).is_err() {
            break;
        }
        delivered += 1;
    }

    debug!(delivered, "Replay finished");
    running.store(false, Ordering::SeqCst);
}

/// Sleeps so that samples are delivered at their recorded offsets.
#[derive(Default)]
struct Pacer {
    origin: Option<(Instant, Duration)>,
}

impl Pacer {
    fn wait_for(&mut self, timestamp: Duration) {
        let (started, first) = *self.origin.get_or_insert((Instant::now(), timestamp));
        let offset = timestamp.saturating_sub(first);
        let elapsed = started.elapsed();
        if offset > elapsed {
            thread::sleep(offset - elapsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::types::{DeviceEvent, GazeEvent};
    use std::io::Cursor;

    const RECORDING: &str = r#"
# device comes up first
{"event":"device_added","device":{"id":1,"configuration_state":"ready","can_track_eyes":true}}
{"event":"enumeration_completed"}

{"event":"gaze_entered","sample":{"timestamp_us":0,"position":{"x":10.0,"y":20.0}}}
not json at all
{"event":"gaze_moved","samples":[{"timestamp_us":33000,"position":{"x":10.0,"y":20.0}}]}
"#;

    #[test]
    fn test_replay_delivers_events_in_order() {
        let mut source = ReplaySource::from_reader(Cursor::new(RECORDING), ReplayConfig::default());
        source.start().unwrap();

        let events: Vec<InputEvent> = source.receiver().iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events[0], InputEvent::Device(DeviceEvent::Added { .. })));
        assert_eq!(events[1], InputEvent::Device(DeviceEvent::EnumerationCompleted));
        assert!(matches!(events[2], InputEvent::Gaze(GazeEvent::Entered { .. })));
        assert!(matches!(events[3], InputEvent::Gaze(GazeEvent::Moved { .. })));
        assert!(!source.is_running());
    }

    #[test]
    fn test_replay_cannot_start_twice() {
        let mut source = ReplaySource::from_reader(Cursor::new(""), ReplayConfig::default());
        source.start().unwrap();
        let _ = source.receiver().iter().count();

        assert!(matches!(source.start(), Err(SourceError::Exhausted)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ReplaySource::from_path(
            Path::new("/definitely/not/here.jsonl"),
            ReplayConfig::default(),
        );
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
