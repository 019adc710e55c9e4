// Network quality: HTTP round-trip latency, jitter and sync-packet counters per remote.

use serde::{Deserialize, Serialize};

use crate::rollup::QualityRating;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkQualitySample {
    pub timestamp: i64,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latency: Option<f64>,
    #[serde(default)]
    pub jitter: Option<f64>,
    #[serde(default)]
    pub player_packets_sent: Option<u64>,
    /// Monotonic counter reported by the remote; may reset to a lower value on restart.
    #[serde(default)]
    pub remote_packets_received: Option<u64>,
    /// `Some(false)` excludes the sample from packet-loss estimation.
    #[serde(default)]
    pub is_playing: Option<bool>,
    /// Frame step time (ms) of the sequence being played, when known.
    #[serde(default)]
    pub step_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_quality: Option<QualityRating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter_quality: Option<QualityRating>,
}

impl NetworkQualitySample {
    pub fn new(timestamp: i64, hostname: impl Into<String>) -> Self {
        Self {
            timestamp,
            hostname: Some(hostname.into()),
            address: None,
            latency: None,
            jitter: None,
            player_packets_sent: None,
            remote_packets_received: None,
            is_playing: None,
            step_time: None,
            latency_quality: None,
            jitter_quality: None,
        }
    }
}

/// One record per host per bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkQualityRollup {
    pub timestamp: i64,
    pub period_start: i64,
    pub period_end: i64,
    pub hostname: String,
    pub address: String,
    pub sample_count: u64,
    pub latency_min: Option<f64>,
    pub latency_max: Option<f64>,
    pub latency_avg: Option<f64>,
    pub latency_p95: Option<f64>,
    pub latency_quality: Option<QualityRating>,
    pub jitter_avg: Option<f64>,
    pub jitter_max: Option<f64>,
    pub jitter_quality: Option<QualityRating>,
    /// Packets per second actually received over the bucket window.
    pub receive_rate: Option<f64>,
    pub packet_loss_pct: Option<f64>,
    pub packet_loss_quality: Option<QualityRating>,
    pub overall_quality: QualityRating,
}
