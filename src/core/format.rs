//! Text rendering for log lines.

use crate::source::types::GazeSample;
use chrono::{DateTime, Local, Timelike};
use std::time::Duration;

/// Render a wall-clock time as `dd/mm/yy HH:MM:SS.ff`.
pub fn format_wall(time: &DateTime<Local>) -> String {
    let hundredths = time.nanosecond() % 1_000_000_000 / 10_000_000;
    format!("{}.{:02}", time.format("%d/%m/%y %H:%M:%S"), hundredths)
}

/// Render a duration in general long form, `d:hh:mm:ss.fffffff`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let ticks = duration.subsec_nanos() / 100;
    format!(
        "{}:{:02}:{:02}:{:02}.{:07}",
        secs / 86_400,
        secs / 3_600 % 24,
        secs / 60 % 60,
        secs % 60,
        ticks
    )
}

/// Prefix `message` with the sample timestamp and append its position.
pub fn sample_line(message: &str, sample: &GazeSample) -> String {
    format!(
        "{}\t{}\t{}",
        format_duration(sample.timestamp),
        message,
        sample.position
    )
}
