//! Atomic counters describing what the monitor has observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Running statistics for the current monitor session.
#[derive(Debug)]
pub struct MonitorStats {
    /// Gaze samples counted into windows
    samples_processed: AtomicU64,
    /// Windows whose summary was finalized
    windows_completed: AtomicU64,
    /// Stream-consistency and liveness anomalies logged
    anomalies: AtomicU64,
    /// Blinks detected
    blinks: AtomicU64,
    /// Lines appended to the persisted log
    lines_persisted: AtomicU64,
    /// Failed persisted-log writes
    write_failures: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl MonitorStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self {
            samples_processed: AtomicU64::new(0),
            windows_completed: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            blinks: AtomicU64::new(0),
            lines_persisted: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create statistics that load from and save to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            debug!("Could not load previous monitor stats: {e}");
        }

        stats
    }

    /// Record a sample counted into a window.
    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finalized window.
    pub fn record_window_completed(&self) {
        self.windows_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a logged anomaly.
    pub fn record_anomaly(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a detected blink.
    pub fn record_blink(&self) {
        self.blinks.fetch_add(1, Ordering::Relaxed);
    }

    /// Record lines appended to the log file.
    pub fn record_lines_persisted(&self, count: u64) {
        self.lines_persisted.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed log write.
    pub fn record_write_failure(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            windows_completed: self.windows_completed.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            blinks: self.blinks.load(Ordering::Relaxed),
            lines_persisted: self.lines_persisted.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Monitor Statistics:\n\
             - Samples processed: {}\n\
             - Windows completed: {}\n\
             - Blinks detected: {}\n\
             - Anomalies logged: {}\n\
             - Lines persisted: {}\n\
             - Write failures: {}\n\
             - Session duration: {} seconds",
            stats.samples_processed,
            stats.windows_completed,
            stats.blinks,
            stats.anomalies,
            stats.lines_persisted,
            stats.write_failures,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                samples_processed: stats.samples_processed,
                windows_completed: stats.windows_completed,
                anomalies: stats.anomalies,
                blinks: stats.blinks,
                lines_persisted: stats.lines_persisted,
                write_failures: stats.write_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.samples_processed
                    .store(persisted.samples_processed, Ordering::Relaxed);
                self.windows_completed
                    .store(persisted.windows_completed, Ordering::Relaxed);
                self.anomalies.store(persisted.anomalies, Ordering::Relaxed);
                self.blinks.store(persisted.blinks, Ordering::Relaxed);
                self.lines_persisted
                    .store(persisted.lines_persisted, Ordering::Relaxed);
                self.write_failures
                    .store(persisted.write_failures, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.samples_processed.store(0, Ordering::Relaxed);
        self.windows_completed.store(0, Ordering::Relaxed);
        self.anomalies.store(0, Ordering::Relaxed);
        self.blinks.store(0, Ordering::Relaxed);
        self.lines_persisted.store(0, Ordering::Relaxed);
        self.write_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of monitor statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_processed: u64,
    pub windows_completed: u64,
    pub anomalies: u64,
    pub blinks: u64,
    pub lines_persisted: u64,
    pub write_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    samples_processed: u64,
    windows_completed: u64,
    anomalies: u64,
    blinks: u64,
    lines_persisted: u64,
    write_failures: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared statistics.
pub type SharedMonitorStats = Arc<MonitorStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedMonitorStats {
    Arc::new(MonitorStats::new())
}

/// Create new shared statistics with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedMonitorStats {
    Arc::new(MonitorStats::with_persistence(path))
}
