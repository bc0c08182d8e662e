//! Integration tests driving the monitor end to end.

use gaze_stack_watcher::core::{GazeMonitor, ManualClock, RunEnd};
use gaze_stack_watcher::sink::{DisplayHistory, LogSink};
use gaze_stack_watcher::source::{
    ConfigurationState, DeviceEvent, EventSource, GazeDevice, GazeEvent, GazeSample, InputEvent,
    ReplayConfig, ReplaySource, SimulatedSource, SimulationConfig,
};
use gaze_stack_watcher::stats::create_shared_stats;
use gaze_stack_watcher::Config;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tokio::runtime::Handle;

fn build_monitor(log_path: &Path, clock: &ManualClock) -> GazeMonitor {
    let config = Config::default();
    let stats = create_shared_stats();
    let mut sink = LogSink::new(DisplayHistory::default(), Handle::current(), stats.clone())
        .with_flush_delay(Duration::from_millis(5));
    sink.attach_file(log_path);
    GazeMonitor::with_clock(&config, sink, stats, Box::new(clock.clone()))
}

fn log_path(dir: &tempfile::TempDir) -> PathBuf {
    dir.path().join("activity.log")
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_blink_example_is_summarized_on_exit() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);
    let instance_id = monitor.instance_id();

    monitor.start();
    monitor.handle(
        DeviceEvent::Added {
            device: GazeDevice::new(3, ConfigurationState::Ready),
        }
        .into(),
    );
    monitor.handle(
        GazeEvent::Entered {
            sample: GazeSample::at_millis(0, 10.0, 10.0),
        }
        .into(),
    );
    for sample in [
        GazeSample::at_millis(0, 10.0, 10.0),
        GazeSample::at_millis(100, 10.0, 10.0),
        GazeSample::at_millis(1000, 20.0, 30.0),
    ] {
        monitor.handle(GazeEvent::Moved { samples: vec![sample] }.into());
    }

    let summary = monitor.current_summary().unwrap();
    assert_eq!(summary.min_delta, Some(Duration::from_millis(100)));
    assert_eq!(summary.max_delta, Some(Duration::from_millis(900)));
    assert_eq!(summary.repeated_positions, 1);
    assert_eq!(summary.new_positions, 2);
    assert_eq!(summary.blinks, 1);

    monitor.handle(
        GazeEvent::Exited {
            sample: GazeSample::absent_at_millis(1033),
        }
        .into(),
    );
    monitor.shutdown().await.unwrap();

    let lines = read_lines(&path);
    assert_eq!(lines.len(), 6);
    assert!(lines[0].ends_with(&format!("\tStarted\tInstance={instance_id}")));
    assert!(lines[1].contains("\tDevice added, count=1\tId=3, State=Ready"));
    assert!(lines[2].ends_with("\t0:00:00:00.0000000\tGaze entered\t10,10"));
    assert!(lines[3].contains(
        "Reported total of 3 points, 1 repeated positions, 1 blinks and 0 null positions"
    ));
    assert!(lines[4].ends_with("\tGaze exited\tNo Position"));
    assert!(lines[5].ends_with("\tStopped"));
}

#[tokio::test]
async fn test_inconsistent_first_report_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);

    monitor.handle(
        DeviceEvent::Added {
            device: GazeDevice::new(1, ConfigurationState::Ready),
        }
        .into(),
    );
    monitor.handle(
        GazeEvent::Entered {
            sample: GazeSample::absent_at_millis(0),
        }
        .into(),
    );
    monitor.handle(
        GazeEvent::Moved {
            samples: vec![GazeSample::at_millis(16, 4.0, 2.0)],
        }
        .into(),
    );
    monitor.shutdown().await.unwrap();

    let lines = read_lines(&path);
    assert!(lines[2].ends_with("\tFirst report after enter is inconsistent\t4,2"));
    assert!(lines[3].contains("Reported total of 1 points"));
    assert!(lines[4].ends_with("\tStopped"));
}

#[tokio::test]
async fn test_replayed_recording_round_trips_to_file() {
    let recording = r#"
{"event":"gaze_entered","sample":{"timestamp_us":0,"position":{"x":1.0,"y":1.0}}}
{"event":"device_added","device":{"id":9,"configuration_state":"ready","can_track_eyes":true,"can_track_head":true}}
{"event":"enumeration_completed"}
{"event":"gaze_moved","samples":[{"timestamp_us":0}]}
{"event":"gaze_moved","samples":[{"timestamp_us":16000},{"timestamp_us":32000,"position":{"x":5.0,"y":5.0}}]}
{"event":"gaze_exited","sample":{"timestamp_us":48000}}
{"event":"gaze_exited","sample":{"timestamp_us":64000}}
{"event":"device_removed","device":{"id":9,"configuration_state":"ready"}}
"#;

    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);
    let mut source = ReplaySource::from_reader(Cursor::new(recording), ReplayConfig::default());
    source.start().unwrap();

    let end = monitor.run(source.receiver(), &AtomicBool::new(true));
    assert_eq!(end, RunEnd::SourceFinished);
    monitor.shutdown().await.unwrap();

    let lines = read_lines(&path);
    let messages: Vec<&str> = lines
        .iter()
        .map(|l| l.splitn(2, '\t').nth(1).unwrap_or(""))
        .collect();

    // The enter arrives before any device, so sample delivery is not yet
    // attached and the first report comes without an enter.
    assert!(messages[0].starts_with("Device added, count=1\tId=9"));
    assert!(messages[0].ends_with("Head=true"));
    assert_eq!(messages[1], "Device enumeration complete, count=1");
    assert_eq!(messages[2], "Gaze report without enter");
    assert!(messages[3].starts_with(
        "Reported total of 1 points, 0 repeated positions, 0 blinks and 1 null positions"
    ));
    assert_eq!(messages[4], "Grouped points reported in move, Count=2");
    assert!(messages[5].starts_with(
        "Reported total of 2 points, 0 repeated positions, 0 blinks and 1 null positions"
    ));
    assert_eq!(messages[6], "0:00:00:00.0480000\tGaze exited\tNo Position");
    assert_eq!(
        messages[7],
        "0:00:00:00.0640000\tUnexpected gaze exit without prior enter\tNo Position"
    );
    assert!(messages[8].starts_with("Device removed, count=0"));
    assert_eq!(messages[9], "Stopped");
    assert_eq!(messages.len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_every_logged_line_is_persisted_once_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);

    for i in 0..500 {
        monitor.log(&format!("burst {i}"));
        if i % 50 == 0 {
            tokio::time::sleep(Duration::from_millis(3)).await;
        }
    }
    let sink = monitor.shutdown().await.unwrap();

    let lines = read_lines(&path);
    let bursts: Vec<&str> = lines
        .iter()
        .filter_map(|l| l.split('\t').nth(1))
        .filter(|m| m.starts_with("burst "))
        .collect();
    let expected: Vec<String> = (0..500).map(|i| format!("burst {i}")).collect();
    assert_eq!(bursts, expected);
    assert_eq!(sink.pending(), 0);
    assert_eq!(sink.display().len(), 501);
}

#[tokio::test]
async fn test_display_history_stays_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);

    for i in 0..1_200 {
        monitor.log(&format!("entry {i}"));
    }

    let display = monitor.sink().display();
    assert_eq!(display.len(), 1000);
    assert!(display.head().unwrap().ends_with("\tentry 1199"));
    assert!(display.lines().last().unwrap().ends_with("\tentry 200"));

    monitor.shutdown().await.unwrap();
    assert_eq!(read_lines(&path).len(), 1_201);
}

#[tokio::test]
async fn test_simulated_stream_keeps_counts_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = log_path(&dir);
    let clock = ManualClock::new();
    let mut monitor = build_monitor(&path, &clock);
    let mut source = SimulatedSource::new(SimulationConfig {
        duration: Duration::from_secs(5),
        realtime: false,
    });
    source.start().unwrap();

    // Any logged line closes the window, and a grouped delivery logs before
    // its samples open a fresh one.
    let mut expected = 0u64;
    while let Ok(event) = source.receiver().recv() {
        let was_reporting = monitor.classifier().is_reporting();
        expected = match &event {
            InputEvent::Gaze(GazeEvent::Moved { samples })
                if samples.len() == 1 && was_reporting =>
            {
                expected + 1
            }
            InputEvent::Gaze(GazeEvent::Moved { samples }) => samples.len() as u64,
            _ => 0,
        };
        monitor.handle(event);

        if monitor.classifier().is_reporting() {
            assert_eq!(monitor.classifier().window().total_points(), expected);
        }
    }

    assert!(!monitor.classifier().is_reporting());
    assert_eq!(monitor.registry().device_count(), 0);
    monitor.shutdown().await.unwrap();

    let lines = read_lines(&path);
    assert!(lines.iter().any(|l| l.contains("blinks")));
    assert!(lines.iter().any(|l| l.contains("Grouped points reported in move, Count=2")));
}
