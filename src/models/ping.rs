// Connectivity ping: one raw sample per probe, one rollup record per bucket.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Probe outcome; anything other than "success"/"failure" on disk reads as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PingStatus {
    Success,
    Failure,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingSample {
    pub timestamp: i64,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub status: Option<PingStatus>,
}

/// Aggregate of all probes in one bucket, regardless of host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingRollup {
    pub timestamp: i64,
    pub period_start: i64,
    pub period_end: i64,
    pub min_latency: Option<f64>,
    pub max_latency: Option<f64>,
    pub avg_latency: Option<f64>,
    pub sample_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Samples seen per host in this bucket.
    pub hosts: BTreeMap<String, u64>,
}
