// Shared test helpers

use tiered_metrics::models::{PingSample, PingStatus};

/// A Unix time aligned to every standard tier boundary (divisible by 7200).
pub const T0: i64 = 1_699_999_200;

pub fn ping_sample(timestamp: i64, host: &str, latency: f64) -> PingSample {
    PingSample {
        timestamp,
        host: Some(host.to_string()),
        latency: Some(latency),
        status: Some(PingStatus::Success),
    }
}

pub fn failed_ping(timestamp: i64, host: &str) -> PingSample {
    PingSample {
        timestamp,
        host: Some(host.to_string()),
        latency: None,
        status: Some(PingStatus::Failure),
    }
}

pub fn line_count(path: &std::path::Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
