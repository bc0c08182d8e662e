//! Append-only log sink.
//!
//! Every line goes to the bounded display history and to a shared buffer.
//! A single background writer drains the buffer into the log file. A
//! non-blocking gate admits at most one writer; a writer keeps draining
//! until the buffer stays empty, so lines appended while it runs are never
//! stranded.

pub mod buffer;
pub mod display;
mod writer;

use crate::stats::SharedMonitorStats;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use writer::{ErrorSlot, FlushTask};

pub use buffer::LogBuffer;
pub use display::{DisplayHistory, DisplaySurface, MAX_DISPLAY_ENTRIES};

/// Delay before a writer drains, so bursts land in one append.
pub const DEFAULT_FLUSH_DELAY: Duration = Duration::from_millis(500);

/// Errors raised by the log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    Io(String),
    Closed,
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "IO error: {e}"),
            SinkError::Closed => write!(f, "Log sink is closed"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Display history plus buffered, asynchronously persisted log file.
pub struct LogSink<D: DisplaySurface = DisplayHistory> {
    display: D,
    buffer: Arc<LogBuffer>,
    gate: Arc<Semaphore>,
    file: Option<PathBuf>,
    flush_delay: Duration,
    runtime: Handle,
    stats: SharedMonitorStats,
    last_error: ErrorSlot,
}

impl<D: DisplaySurface> LogSink<D> {
    /// Create a sink whose writer runs on `runtime`.
    pub fn new(display: D, runtime: Handle, stats: SharedMonitorStats) -> Self {
        Self {
            display,
            buffer: Arc::new(LogBuffer::new()),
            gate: Arc::new(Semaphore::new(1)),
            file: None,
            flush_delay: DEFAULT_FLUSH_DELAY,
            runtime,
            stats,
            last_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_flush_delay(mut self, delay: Duration) -> Self {
        self.flush_delay = delay;
        self
    }

    /// Start persisting to `path`. Lines buffered so far are written first.
    pub fn attach_file(&mut self, path: impl Into<PathBuf>) {
        self.file = Some(path.into());
        self.start_writer();
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn insert_head(&mut self, line: String) {
        self.display.insert_head(line);
    }

    pub fn replace_head(&mut self, line: String) {
        self.display.replace_head(line);
    }

    /// Queue a finalized line for persistence.
    pub fn append(&self, line: String) {
        self.buffer.push(line);
        self.start_writer();
    }

    /// Lines waiting to be written.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Whether a writer currently holds the gate.
    pub fn is_flushing(&self) -> bool {
        self.gate.available_permits() == 0
    }

    /// The most recent write failure, if any.
    pub fn last_error(&self) -> Option<SinkError> {
        self.last_error.lock().ok().and_then(|slot| slot.clone())
    }

    fn flush_task(&self, path: PathBuf, delay: Duration) -> FlushTask {
        FlushTask {
            buffer: self.buffer.clone(),
            gate: self.gate.clone(),
            path,
            delay,
            stats: self.stats.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn start_writer(&self) {
        let Some(path) = self.file.clone() else {
            return;
        };
        if self.buffer.is_empty() {
            return;
        }
        if let Ok(permit) = self.gate.clone().try_acquire_owned() {
            let task = self.flush_task(path, self.flush_delay);
            self.runtime.spawn(task.run(permit));
        }
    }

    /// Wait for any running writer, then write everything still pending.
    pub async fn flush(&self) -> Result<(), SinkError> {
        let Some(path) = self.file.clone() else {
            return Ok(());
        };
        let _permit = self
            .gate
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SinkError::Closed)?;

        let task = self.flush_task(path, Duration::ZERO);
        while task.drain_once().await? > 0 {}
        Ok(())
    }
}
