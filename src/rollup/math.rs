// Shared aggregation math: latency statistics, RFC 3550 jitter, quality ratings.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Rounds half away from zero to `precision` decimals.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub p95: Option<f64>,
}

/// Min/max/avg (and optionally P95) rounded to `precision`. Empty input gives all `None`.
/// P95 is the element at index `ceil(0.95 * n) - 1` of the sorted values.
pub fn aggregate_latencies(values: &[f64], precision: u32, include_p95: bool) -> LatencyStats {
    if values.is_empty() {
        return LatencyStats::default();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();

    let p95 = include_p95.then(|| {
        let idx = (95 * n).div_ceil(100).saturating_sub(1);
        round_to(sorted[idx.min(n - 1)], precision)
    });

    LatencyStats {
        min: Some(round_to(sorted[0], precision)),
        max: Some(round_to(sorted[n - 1], precision)),
        avg: mean(&sorted).map(|a| round_to(a, precision)),
        p95,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct JitterEntry {
    prev_latency: f64,
    jitter: f64,
}

/// Per-key RFC 3550 jitter estimator state, owned by whoever records observations.
#[derive(Debug, Clone, Default)]
pub struct JitterTracker {
    entries: HashMap<String, JitterEntry>,
}

impl JitterTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `J += (|latency - prev| - J) / 16`, rounded to 2 decimals. The first latency seen
    /// for a key only seeds state and returns `None`.
    pub fn calculate_rfc3550(&mut self, key: &str, latency: f64) -> Option<f64> {
        match self.entries.get_mut(key) {
            None => {
                self.entries.insert(
                    key.to_string(),
                    JitterEntry {
                        prev_latency: latency,
                        jitter: 0.0,
                    },
                );
                None
            }
            Some(entry) => {
                let d = (latency - entry.prev_latency).abs();
                entry.jitter += (d - entry.jitter) / 16.0;
                entry.prev_latency = latency;
                Some(round_to(entry.jitter, 2))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterSummary {
    pub avg: f64,
    pub max: f64,
}

/// Runs the RFC 3550 estimator over a time-ordered series from a zero start.
/// Needs at least two values.
pub fn calculate_jitter_from_latencies(latencies: &[f64]) -> Option<JitterSummary> {
    if latencies.len() < 2 {
        return None;
    }
    let mut jitter = 0.0_f64;
    let mut max = 0.0_f64;
    let mut sum = 0.0_f64;
    for pair in latencies.windows(2) {
        let d = (pair[1] - pair[0]).abs();
        jitter += (d - jitter) / 16.0;
        sum += jitter;
        max = max.max(jitter);
    }
    let count = (latencies.len() - 1) as f64;
    Some(JitterSummary {
        avg: round_to(sum / count, 2),
        max: round_to(max, 2),
    })
}

/// Ordered best to worst, so `max` picks the worst rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityRating {
    Good,
    Fair,
    Poor,
    Critical,
}

impl QualityRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityRating::Good => "good",
            QualityRating::Fair => "fair",
            QualityRating::Poor => "poor",
            QualityRating::Critical => "critical",
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThresholds {
    pub good: f64,
    pub fair: f64,
    pub poor: f64,
}

impl QualityThresholds {
    pub const fn new(good: f64, fair: f64, poor: f64) -> Self {
        Self { good, fair, poor }
    }

    pub fn rate(&self, value: f64) -> QualityRating {
        if value <= self.good {
            QualityRating::Good
        } else if value <= self.fair {
            QualityRating::Fair
        } else if value <= self.poor {
            QualityRating::Poor
        } else {
            QualityRating::Critical
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.good <= self.fair && self.fair <= self.poor
    }
}

/// Worst of the given ratings; `Good` when none are known.
pub fn overall_quality_rating(ratings: &[Option<QualityRating>]) -> QualityRating {
    ratings
        .iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(QualityRating::Good)
}

/// Thresholds for latency (ms), jitter (ms) and packet loss (%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub latency: QualityThresholds,
    pub jitter: QualityThresholds,
    pub packet_loss: QualityThresholds,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            latency: QualityThresholds::new(50.0, 100.0, 250.0),
            jitter: QualityThresholds::new(10.0, 20.0, 50.0),
            packet_loss: QualityThresholds::new(1.0, 2.0, 5.0),
        }
    }
}
