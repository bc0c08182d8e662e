//! Background writer that appends buffered lines to the log file.

use crate::sink::buffer::LogBuffer;
use crate::sink::SinkError;
use crate::stats::SharedMonitorStats;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error};

/// Shared slot holding the most recent write failure.
pub(crate) type ErrorSlot = Arc<Mutex<Option<SinkError>>>;

/// One run of the single background writer.
#[derive(Clone)]
pub(crate) struct FlushTask {
    pub(crate) buffer: Arc<LogBuffer>,
    pub(crate) gate: Arc<Semaphore>,
    pub(crate) path: PathBuf,
    pub(crate) delay: Duration,
    pub(crate) stats: SharedMonitorStats,
    pub(crate) last_error: ErrorSlot,
}

impl FlushTask {
    /// Drain the buffer until it stays empty, then release the gate.
    pub(crate) async fn run(self, permit: OwnedSemaphorePermit) {
        let mut permit = permit;
        loop {
            loop {
                tokio::time::sleep(self.delay).await;

                if let Err(e) = self.drain_once().await {
                    error!(path = %self.path.display(), "Log write failed: {e}");
                    return;
                }
                if self.buffer.is_empty() {
                    break;
                }
            }

            drop(permit);

            // A line appended between the last check and the release found
            // the gate closed; pick it up unless another writer already has.
            if self.buffer.is_empty() {
                break;
            }
            match self.gate.clone().try_acquire_owned() {
                Ok(next) => permit = next,
                Err(_) => break,
            }
        }
        debug!("Log writer idle");
    }

    /// Drain pending lines and append them to the file.
    ///
    /// On failure the drained lines are put back at the front of the buffer
    /// and the error is recorded.
    pub(crate) async fn drain_once(&self) -> Result<usize, SinkError> {
        let lines = self.buffer.drain_all();
        if lines.is_empty() {
            return Ok(0);
        }

        match append_lines(&self.path, &lines).await {
            Ok(()) => {
                self.stats.record_lines_persisted(lines.len() as u64);
                Ok(lines.len())
            }
            Err(e) => {
                self.buffer.requeue_front(lines);
                self.stats.record_write_failure();
                let err = SinkError::Io(format!("{}: {e}", self.path.display()));
                if let Ok(mut slot) = self.last_error.lock() {
                    *slot = Some(err.clone());
                }
                Err(err)
            }
        }
    }
}

async fn append_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let mut text = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        text.push_str(line);
        text.push('\n');
    }

    file.write_all(text.as_bytes()).await?;
    file.flush().await
}
