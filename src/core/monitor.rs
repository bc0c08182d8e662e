//! The gaze monitor: routes input events through the registry and the
//! session classifier and writes the resulting activity log.
//!
//! All methods run on one logical thread. The only state shared with another
//! task is the log sink's buffer.

use crate::config::Config;
use crate::core::clock::{Clock, SystemClock};
use crate::core::format::{format_duration, format_wall};
use crate::core::registry::{DeviceRegistry, SampleHookup};
use crate::core::reporter::PeriodicReporter;
use crate::core::session::{SessionClassifier, WindowSummary};
use crate::sink::{DisplayHistory, DisplaySurface, LogSink, SinkError};
use crate::source::types::{DeviceEvent, GazeEvent, GazeSample, InputEvent};
use crate::stats::SharedMonitorStats;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How long the event loop waits for input before checking the reporter.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Gate for gaze-sample delivery, opened by the registry's hookup.
#[derive(Debug, Default)]
struct GazeGate {
    attached: bool,
}

impl SampleHookup for GazeGate {
    fn attach_gaze_source(&mut self) {
        self.attached = true;
    }
}

/// Why the event loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// The source finished and disconnected
    SourceFinished,
    /// The running flag was cleared
    Stopped,
}

/// Stream-health monitor for a single gaze input source.
pub struct GazeMonitor<D: DisplaySurface = DisplayHistory> {
    classifier: SessionClassifier,
    registry: DeviceRegistry,
    reporter: PeriodicReporter,
    gate: GazeGate,
    sink: LogSink<D>,
    clock: Box<dyn Clock>,
    stats: SharedMonitorStats,
    instance_id: Uuid,
}

impl<D: DisplaySurface> GazeMonitor<D> {
    /// Create a monitor using the system clock.
    pub fn new(config: &Config, sink: LogSink<D>, stats: SharedMonitorStats) -> Self {
        Self::with_clock(config, sink, stats, Box::new(SystemClock::new()))
    }

    pub fn with_clock(
        config: &Config,
        sink: LogSink<D>,
        stats: SharedMonitorStats,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            classifier: SessionClassifier::new(),
            registry: DeviceRegistry::new(),
            reporter: PeriodicReporter::new(config.report_interval, config.input_pause_timeout),
            gate: GazeGate::default(),
            sink,
            clock,
            stats,
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn classifier(&self) -> &SessionClassifier {
        &self.classifier
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn reporter(&self) -> &PeriodicReporter {
        &self.reporter
    }

    pub fn sink(&self) -> &LogSink<D> {
        &self.sink
    }

    /// Whether gaze events are being delivered to the classifier.
    pub fn is_gaze_attached(&self) -> bool {
        self.gate.attached
    }

    /// Statistics of the open window, if any.
    pub fn current_summary(&self) -> Option<WindowSummary> {
        self.classifier.summary()
    }

    /// Log the session start line.
    pub fn start(&mut self) {
        info!(instance_id = %self.instance_id, "Monitor started");
        self.log(&format!("Started\tInstance={}", self.instance_id));
    }

    /// Route one input event.
    pub fn handle(&mut self, event: InputEvent) {
        match event {
            InputEvent::Device(event) => self.on_device(&event),
            InputEvent::Gaze(event) => self.on_gaze(event),
        }
    }

    pub fn on_device(&mut self, event: &DeviceEvent) {
        let message = self.registry.apply(event, &mut self.gate);
        debug!(count = self.registry.device_count(), "{message}");
        self.log(&message);
    }

    pub fn on_gaze(&mut self, event: GazeEvent) {
        if !self.gate.attached {
            debug!("Gaze event before any device was added; ignored");
            return;
        }

        match event {
            GazeEvent::Entered { sample } => {
                let message = self.classifier.enter(&sample);
                self.log(&message);
            }
            GazeEvent::Moved { samples } => {
                if samples.len() != 1 {
                    warn!(count = samples.len(), "Grouped points in one move");
                    self.stats.record_anomaly();
                    self.log(&format!(
                        "Grouped points reported in move, Count={}",
                        samples.len()
                    ));
                }
                for sample in &samples {
                    self.on_sample(sample);
                }
            }
            GazeEvent::Exited { sample } => {
                if !self.classifier.is_entered() {
                    warn!("Gaze exit without prior enter");
                    self.stats.record_anomaly();
                }
                let message = self.classifier.exit(&sample);
                self.log(&message);
            }
        }
    }

    fn on_sample(&mut self, sample: &GazeSample) {
        if let Some(anomaly) = self.classifier.validate(sample) {
            warn!(?anomaly, "Stream inconsistency");
            self.stats.record_anomaly();
            self.log(&anomaly.message());
        }

        let now = self.clock.tick_count();
        let outcome = self.classifier.record(sample, now);
        if outcome.window_started {
            self.reporter.start(now);
        }

        self.stats.record_sample();
        if outcome.blink {
            self.stats.record_blink();
        }
    }

    /// Refresh the preview line and check for an input pause when a
    /// reporter tick is due.
    pub fn tick(&mut self) {
        let now = self.clock.tick_count();
        if !self.reporter.poll(now) {
            return;
        }
        let Some(summary) = self.classifier.summary() else {
            self.reporter.stop();
            return;
        };

        let text = summary.render(&format_wall(&self.clock.wall()));
        if self.reporter.is_preview_shown() {
            self.sink.replace_head(text);
        } else {
            self.sink.insert_head(text);
            self.reporter.mark_preview_shown();
        }

        if self
            .reporter
            .is_input_paused(self.classifier.last_tick_count(), now)
        {
            let timeout = self.reporter.pause_timeout();
            warn!(timeout_secs = timeout.as_secs(), "Input paused");
            self.stats.record_anomaly();
            self.log(&format!(
                "Input paused longer than {}",
                format_duration(timeout)
            ));
        }
    }

    /// Write a line to the activity log.
    ///
    /// An open window is finalized first, so its statistics always precede
    /// the message.
    pub fn log(&mut self, message: &str) {
        let timestamp = format_wall(&self.clock.wall());

        if let Some(summary) = self.classifier.summary() {
            let text = summary.render(&timestamp);
            if self.reporter.take_preview() {
                self.sink.replace_head(text.clone());
            } else {
                self.sink.insert_head(text.clone());
            }
            self.sink.append(text);

            self.reporter.stop();
            self.classifier.close_window();
            self.stats.record_window_completed();
            debug!(
                points = summary.total_points,
                blinks = summary.blinks,
                "Window finalized"
            );
        }

        let line = format!("{timestamp}\t{message}");
        self.sink.insert_head(line.clone());
        self.sink.append(line);
    }

    /// Process events until the source disconnects or `running` is cleared.
    pub fn run(&mut self, receiver: &Receiver<InputEvent>, running: &AtomicBool) -> RunEnd {
        while running.load(Ordering::SeqCst) {
            match receiver.recv_timeout(POLL_INTERVAL) {
                Ok(event) => self.handle(event),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return RunEnd::SourceFinished,
            }
            self.tick();
        }
        RunEnd::Stopped
    }

    /// Log the final line and wait until everything is persisted.
    pub async fn shutdown(mut self) -> Result<LogSink<D>, SinkError> {
        self.log("Stopped");
        info!(instance_id = %self.instance_id, "Monitor stopped");
        self.sink.flush().await?;
        Ok(self.sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::source::types::{ConfigurationState, GazeDevice};
    use crate::stats::create_shared_stats;
    use tokio::runtime::Handle;

    fn monitor(clock: &ManualClock) -> GazeMonitor {
        let stats = create_shared_stats();
        let sink = LogSink::new(DisplayHistory::default(), Handle::current(), stats);
        GazeMonitor::with_clock(
            &Config::default(),
            sink,
            create_shared_stats(),
            Box::new(clock.clone()),
        )
    }

    fn attach(monitor: &mut GazeMonitor) {
        monitor.on_device(&DeviceEvent::Added {
            device: GazeDevice::new(1, ConfigurationState::Ready),
        });
    }

    fn display(monitor: &GazeMonitor) -> Vec<String> {
        monitor.sink().display().lines().map(str::to_string).collect()
    }

    fn moved(samples: Vec<GazeSample>) -> GazeEvent {
        GazeEvent::Moved { samples }
    }

    #[tokio::test]
    async fn test_gaze_ignored_before_device_added() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);

        monitor.on_gaze(GazeEvent::Entered {
            sample: GazeSample::at_millis(0, 1.0, 1.0),
        });
        assert!(display(&monitor).is_empty());
        assert!(!monitor.is_gaze_attached());

        attach(&mut monitor);
        assert!(monitor.is_gaze_attached());
    }

    #[tokio::test]
    async fn test_log_flushes_open_window_first() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);

        monitor.on_gaze(GazeEvent::Entered {
            sample: GazeSample::at_millis(0, 1.0, 1.0),
        });
        monitor.on_gaze(moved(vec![GazeSample::at_millis(0, 1.0, 1.0)]));
        monitor.on_gaze(moved(vec![GazeSample::at_millis(33, 1.0, 1.0)]));
        assert!(monitor.classifier().is_reporting());

        monitor.log("Unrelated");

        let lines = display(&monitor);
        assert!(lines[0].ends_with("\tUnrelated"));
        assert!(lines[1].contains("Reported total of 2 points, 1 repeated positions"));
        assert!(!monitor.classifier().is_reporting());
        assert!(!monitor.reporter().is_running());
        assert_eq!(monitor.sink().pending(), 4);
    }

    #[tokio::test]
    async fn test_tick_inserts_then_replaces_preview() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);
        monitor.on_gaze(GazeEvent::Entered {
            sample: GazeSample::at_millis(0, 1.0, 1.0),
        });
        monitor.on_gaze(moved(vec![GazeSample::at_millis(0, 1.0, 1.0)]));
        let before = display(&monitor).len();

        clock.advance(Duration::from_secs(1));
        monitor.tick();
        assert_eq!(display(&monitor).len(), before + 1);
        assert!(monitor.reporter().is_preview_shown());

        monitor.on_gaze(moved(vec![GazeSample::at_millis(33, 2.0, 1.0)]));
        clock.advance(Duration::from_secs(1));
        monitor.tick();
        let lines = display(&monitor);
        assert_eq!(lines.len(), before + 1);
        assert!(lines[0].contains("Reported total of 2 points"));

        // The preview is display-only until the window is finalized.
        let pending = monitor.sink().pending();
        monitor.on_gaze(GazeEvent::Exited {
            sample: GazeSample::absent_at_millis(66),
        });
        let lines = display(&monitor);
        assert_eq!(lines.len(), before + 2);
        assert!(lines[0].contains("\tGaze exited\t"));
        assert!(lines[1].contains("Reported total of 2 points"));
        assert_eq!(monitor.sink().pending(), pending + 2);
    }

    #[tokio::test]
    async fn test_input_pause_is_logged_and_closes_window() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);
        monitor.on_gaze(GazeEvent::Entered {
            sample: GazeSample::absent_at_millis(0),
        });
        monitor.on_gaze(moved(vec![GazeSample::absent_at_millis(0)]));

        for _ in 0..30 {
            clock.advance(Duration::from_secs(1));
            monitor.tick();
        }
        assert!(monitor.classifier().is_reporting());

        clock.advance(Duration::from_secs(1));
        monitor.tick();

        let lines = display(&monitor);
        assert!(lines[0].ends_with("\tInput paused longer than 0:00:00:30.0000000"));
        assert!(lines[1].contains("Reported total of 1 points"));
        assert!(!monitor.classifier().is_reporting());
    }

    #[tokio::test]
    async fn test_grouped_points_are_reported_then_processed() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);
        monitor.on_gaze(GazeEvent::Entered {
            sample: GazeSample::at_millis(0, 1.0, 1.0),
        });

        monitor.on_gaze(moved(vec![
            GazeSample::at_millis(0, 1.0, 1.0),
            GazeSample::at_millis(10, 1.0, 1.0),
            GazeSample::at_millis(20, 2.0, 2.0),
        ]));

        assert!(display(&monitor)[0].ends_with("Grouped points reported in move, Count=3"));
        assert_eq!(monitor.classifier().window().total_points(), 3);
    }

    #[tokio::test]
    async fn test_report_without_enter_is_logged_before_window_opens() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);

        monitor.on_gaze(moved(vec![GazeSample::at_millis(0, 1.0, 1.0)]));

        assert!(display(&monitor)[0].ends_with("\tGaze report without enter"));
        assert!(monitor.classifier().is_reporting());
        assert_eq!(monitor.classifier().window().total_points(), 1);
    }

    #[tokio::test]
    async fn test_enumeration_logs_count_at_that_time() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        attach(&mut monitor);
        attach(&mut monitor);
        monitor.on_device(&DeviceEvent::EnumerationCompleted);
        monitor.on_device(&DeviceEvent::Removed {
            device: GazeDevice::new(1, ConfigurationState::Ready),
        });

        let lines = display(&monitor);
        assert!(lines[0].contains("Device removed, count=1"));
        assert!(lines[1].ends_with("\tDevice enumeration complete, count=2"));
    }

    #[tokio::test]
    async fn test_run_stops_when_source_disconnects() {
        let clock = ManualClock::new();
        let mut monitor = monitor(&clock);
        let (sender, receiver) = crossbeam_channel::unbounded();
        sender
            .send(InputEvent::Device(DeviceEvent::EnumerationCompleted))
            .unwrap();
        drop(sender);

        let running = AtomicBool::new(true);
        assert_eq!(monitor.run(&receiver, &running), RunEnd::SourceFinished);
        assert!(display(&monitor)[0].ends_with("count=0"));
    }
}
