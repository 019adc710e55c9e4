// Multi-sync ping: per remote host latency and jitter.

use serde::{Deserialize, Serialize};

use super::PingStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSyncPingSample {
    pub timestamp: i64,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latency: Option<f64>,
    /// Running RFC 3550 jitter at the time of the probe (null for the first probe of a host).
    #[serde(default)]
    pub jitter: Option<f64>,
    #[serde(default)]
    pub status: Option<PingStatus>,
}

/// One record per host per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSyncPingRollup {
    pub timestamp: i64,
    pub period_start: i64,
    pub period_end: i64,
    pub hostname: String,
    pub address: String,
    pub sample_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub min_latency: Option<f64>,
    pub max_latency: Option<f64>,
    pub avg_latency: Option<f64>,
    pub avg_jitter: Option<f64>,
    pub max_jitter: Option<f64>,
}
