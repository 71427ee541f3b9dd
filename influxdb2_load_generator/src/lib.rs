//! Write and read load generation against an InfluxDB 2 server.
//!
//! The write side fans out one task per (measurement, series) pair. Each task
//! generates a batch of synthetic points, writes them in batches and reports
//! its outcome over a channel. A single aggregator drains those results.
//! The read side runs one Flux range query and counts what comes back.

pub mod aggregator;
pub mod dispatcher;
pub mod generator;
pub mod logging;
pub mod process;

pub mod commands {
    pub mod common;
    pub mod read;
    pub mod write;
}

use std::time::Duration;

/// Drop everything below a millisecond, for human-facing timing output.
pub fn truncate_to_millis(d: Duration) -> Duration {
    Duration::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Render a duration truncated to milliseconds, e.g. `1s 234ms`.
pub fn format_elapsed(d: Duration) -> String {
    let d = truncate_to_millis(d);
    if d.is_zero() {
        return "0ms".to_string();
    }
    humantime::format_duration(d).to_string()
}
