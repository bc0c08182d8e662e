//! Gaze Stack Watcher - health monitor for eye-gaze input streams.
//!
//! This library watches the event stream of a gaze tracker, flags
//! inconsistent device and session behavior, and keeps a rolling activity
//! log in memory and on disk.
//!
//! # What is checked
//!
//! - **Continuity**: the first report after a gaze enter must match the
//!   enter position, and reports must not arrive without an enter
//! - **Batching**: a move delivery should carry exactly one sample
//! - **Dropouts**: gaps over twice the smallest gap in a window count as blinks
//! - **Liveness**: a stream silent for longer than the pause timeout is logged
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Gaze Stack Watcher                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │   Source    │──▶│  Registry   │──▶│             │         │
//! │  │ (replay/sim)│   └─────────────┘   │  Log Sink   │──▶ file │
//! │  │             │   ┌─────────────┐   │ (display +  │         │
//! │  │             │──▶│ Classifier  │──▶│  writer)    │         │
//! │  └─────────────┘   └──────┬──────┘   └─────────────┘         │
//! │                           │ 1s tick         ▲                │
//! │                    ┌──────▼──────┐          │                │
//! │                    │  Reporter   │──────────┘                │
//! │                    └─────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gaze_stack_watcher::{Config, DisplayHistory, GazeMonitor, LogSink};
//! use gaze_stack_watcher::source::{EventSource, SimulatedSource, SimulationConfig};
//! use gaze_stack_watcher::stats::create_shared_stats;
//! use std::sync::atomic::AtomicBool;
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let config = Config::default();
//! let stats = create_shared_stats();
//!
//! let mut sink = LogSink::new(DisplayHistory::default(), runtime.handle().clone(), stats.clone());
//! sink.attach_file(&config.log_path);
//!
//! let mut monitor = GazeMonitor::new(&config, sink, stats);
//! let mut source = SimulatedSource::new(SimulationConfig::default());
//! source.start().unwrap();
//!
//! monitor.start();
//! monitor.run(source.receiver(), &AtomicBool::new(true));
//! runtime.block_on(monitor.shutdown()).unwrap();
//! ```

pub mod config;
pub mod core;
pub mod sink;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{GazeMonitor, SessionClassifier, WindowSummary};
pub use sink::{DisplayHistory, DisplaySurface, LogSink, SinkError};
pub use source::{EventSource, GazeEvent, GazeSample, InputEvent, SourceError};
pub use stats::{MonitorStats, SharedMonitorStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
