//! Monitoring statistics for the Gaze Stack Watcher.
//!
//! Counters are kept across runs so `gaze-watcher status` can report the
//! health of every stream observed so far.

pub mod counters;

// Re-export commonly used types
pub use counters::{
    create_shared_stats, create_shared_stats_with_persistence, MonitorStats, SharedMonitorStats,
    StatsSnapshot,
};
