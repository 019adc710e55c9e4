// Network quality per remote: HTTP latency (+P95), jitter, and packet loss estimated from the
// remote's sync-packet counter over the playing window of each bucket.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

use crate::collector::{MetricsCollector, RollupPolicy};
use crate::models::{NetworkQualityRollup, NetworkQualitySample};
use crate::rollup::{
    Aggregated, JitterTracker, QualityConfig, QualityRating, aggregate_latencies,
    calculate_jitter_from_latencies, math, overall_quality_rating, unix_now,
};

const LATENCY_PRECISION: u32 = 1;
const JITTER_PRECISION: u32 = 2;
const RATE_PRECISION: u32 = 1;
const MIN_SYNC_RATE: f64 = 0.1;
const UNKNOWN_HOST: &str = "unknown";
const STATUS_WINDOW_SECS: i64 = 3600;

pub const DEFAULT_SYNC_RATE: f64 = 2.0;
pub const DEFAULT_FRAMES_PER_SYNC: u32 = 10;

/// One poll of a remote system.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityObservation {
    pub hostname: String,
    pub address: String,
    pub latency: Option<f64>,
    pub player_packets_sent: Option<u64>,
    pub remote_packets_received: Option<u64>,
    pub is_playing: bool,
    pub step_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NetworkQualityPolicy {
    quality: QualityConfig,
    default_sync_rate: f64,
    frames_per_sync: u32,
    jitter: JitterTracker,
}

impl Default for NetworkQualityPolicy {
    fn default() -> Self {
        Self::new(QualityConfig::default(), DEFAULT_SYNC_RATE, DEFAULT_FRAMES_PER_SYNC)
    }
}

impl NetworkQualityPolicy {
    pub fn new(quality: QualityConfig, default_sync_rate: f64, frames_per_sync: u32) -> Self {
        Self {
            quality,
            default_sync_rate: default_sync_rate.max(MIN_SYNC_RATE),
            frames_per_sync: frames_per_sync.max(1),
            jitter: JitterTracker::new(),
        }
    }

    pub fn quality(&self) -> &QualityConfig {
        &self.quality
    }

    /// Sync packets per second the player should emit at frame step `step_ms`.
    pub fn expected_sync_rate(&self, step_ms: Option<i64>) -> f64 {
        match step_ms {
            Some(step) if step > 0 => {
                let fps = 1000.0 / step as f64;
                (fps / f64::from(self.frames_per_sync)).max(MIN_SYNC_RATE)
            }
            _ => self.default_sync_rate,
        }
    }

    fn aggregate_host(&self, host: &str, window: HostWindow) -> NetworkQualityRollup {
        let q = &self.quality;
        let stats = aggregate_latencies(&window.latencies, LATENCY_PRECISION, true);
        let jitter = calculate_jitter_from_latencies(&window.latencies)
            .map(|j| (Some(j.avg), Some(j.max)))
            .unwrap_or_else(|| {
                (
                    math::mean(&window.jitters).map(|j| math::round_to(j, JITTER_PRECISION)),
                    window
                        .jitters
                        .iter()
                        .copied()
                        .reduce(f64::max)
                        .map(|j| math::round_to(j, JITTER_PRECISION)),
                )
            });
        let (jitter_avg, jitter_max) = jitter;

        let loss = window.packet_loss(self);

        let latency_quality = stats.avg.map(|v| q.latency.rate(v));
        let jitter_quality = jitter_avg.map(|v| q.jitter.rate(v));
        let packet_loss_quality = loss.map(|l| q.packet_loss.rate(l.loss_pct));

        NetworkQualityRollup {
            timestamp: 0,
            period_start: 0,
            period_end: 0,
            hostname: host.to_string(),
            address: window.address,
            sample_count: window.sample_count,
            latency_min: stats.min,
            latency_max: stats.max,
            latency_avg: stats.avg,
            latency_p95: stats.p95,
            latency_quality,
            jitter_avg,
            jitter_max,
            jitter_quality,
            receive_rate: loss.map(|l| l.receive_rate),
            packet_loss_pct: loss.map(|l| l.loss_pct),
            packet_loss_quality,
            overall_quality: overall_quality_rating(&[
                latency_quality,
                jitter_quality,
                packet_loss_quality,
            ]),
        }
    }

    /// Per-host aggregates of `samples`, ordered by hostname.
    fn aggregate_hosts(&self, samples: &[NetworkQualitySample]) -> Vec<NetworkQualityRollup> {
        let mut ordered: Vec<&NetworkQualitySample> = samples.iter().collect();
        ordered.sort_by_key(|s| s.timestamp);

        let mut by_host: BTreeMap<&str, HostWindow> = BTreeMap::new();
        for sample in ordered {
            let host = sample.hostname.as_deref().unwrap_or(UNKNOWN_HOST);
            by_host
                .entry(host)
                .or_insert_with(|| HostWindow::new(sample.address.clone().unwrap_or_default()))
                .push(sample);
        }
        by_host
            .into_iter()
            .map(|(host, window)| self.aggregate_host(host, window))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PacketLoss {
    receive_rate: f64,
    loss_pct: f64,
}

/// Everything one host contributed to a bucket, in time order.
#[derive(Debug, Default)]
struct HostWindow {
    address: String,
    sample_count: u64,
    latencies: Vec<f64>,
    jitters: Vec<f64>,
    step_times: Vec<i64>,
    first_counter: Option<(i64, u64)>,
    last_counter: Option<(i64, u64)>,
    counter_samples: usize,
    counter_reset: bool,
}

impl HostWindow {
    fn new(address: String) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    fn push(&mut self, sample: &NetworkQualitySample) {
        self.sample_count += 1;
        self.latencies.extend(sample.latency);
        self.jitters.extend(sample.jitter);

        if sample.is_playing == Some(false) {
            return;
        }
        self.step_times.extend(sample.step_time);
        let Some(received) = sample.remote_packets_received else {
            return;
        };
        if let Some((_, last)) = self.last_counter
            && received < last
        {
            self.counter_reset = true;
        }
        self.first_counter.get_or_insert((sample.timestamp, received));
        self.last_counter = Some((sample.timestamp, received));
        self.counter_samples += 1;
    }

    /// `None` on a counter reset, fewer than two counter samples, or an empty window.
    fn packet_loss(&self, policy: &NetworkQualityPolicy) -> Option<PacketLoss> {
        if self.counter_reset || self.counter_samples < 2 {
            return None;
        }
        let (first_ts, first) = self.first_counter?;
        let (last_ts, last) = self.last_counter?;
        let window = last_ts - first_ts;
        if window <= 0 || last < first {
            return None;
        }

        let delta = (last - first) as f64;
        let secs = window as f64;
        let expected = policy.expected_sync_rate(self.median_step_time()) * secs;
        let loss_pct = ((expected - delta).max(0.0) / expected * 100.0).min(100.0);
        Some(PacketLoss {
            receive_rate: math::round_to(delta / secs, RATE_PRECISION),
            loss_pct: math::round_to(loss_pct, RATE_PRECISION),
        })
    }

    fn median_step_time(&self) -> Option<i64> {
        if self.step_times.is_empty() {
            return None;
        }
        let mut sorted = self.step_times.clone();
        sorted.sort_unstable();
        Some(sorted[sorted.len() / 2])
    }
}

impl RollupPolicy for NetworkQualityPolicy {
    type Sample = NetworkQualitySample;
    type Record = NetworkQualityRollup;

    const NAME: &'static str = "network-quality";

    fn aggregate_for_rollup(
        &self,
        samples: &[NetworkQualitySample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<NetworkQualityRollup> {
        self.aggregate_hosts(samples)
            .into_iter()
            .map(|mut record| {
                record.timestamp = bucket_start;
                record.period_start = bucket_start;
                record.period_end = bucket_start + interval;
                record
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn filter_sample(
        &self,
        sample: NetworkQualitySample,
        host: &str,
    ) -> Option<NetworkQualitySample> {
        (sample.hostname.as_deref() == Some(host)).then_some(sample)
    }

    fn filter_record(
        &self,
        record: NetworkQualityRollup,
        host: &str,
    ) -> Option<NetworkQualityRollup> {
        (record.hostname == host).then_some(record)
    }

    fn record_entity<'a>(&self, record: &'a NetworkQualityRollup) -> Option<&'a str> {
        Some(&record.hostname)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub avg_latency: Option<f64>,
    pub avg_jitter: Option<f64>,
    pub avg_packet_loss: Option<f64>,
    /// Worst host rating, or "unknown" without data.
    pub overall_quality: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkQualityStatus {
    pub success: bool,
    pub timestamp: i64,
    pub hosts: Vec<NetworkQualityRollup>,
    pub summary: QualitySummary,
}

pub type NetworkQualityCollector = MetricsCollector<NetworkQualityPolicy>;

impl MetricsCollector<NetworkQualityPolicy> {
    pub fn network_quality(
        dir: impl Into<PathBuf>,
        policy: NetworkQualityPolicy,
        raw_retention_secs: i64,
    ) -> Self {
        Self::new(policy, dir, raw_retention_secs)
    }

    /// Stamps observations with running jitter and per-sample quality ratings, then appends them.
    pub fn record(&mut self, observations: &[QualityObservation], now: i64) -> bool {
        let policy = self.policy_mut();
        let samples: Vec<NetworkQualitySample> = observations
            .iter()
            .map(|o| {
                let jitter = o
                    .latency
                    .and_then(|l| policy.jitter.calculate_rfc3550(&o.hostname, l));
                NetworkQualitySample {
                    address: Some(o.address.clone()),
                    latency: o.latency,
                    jitter,
                    player_packets_sent: o.player_packets_sent,
                    remote_packets_received: o.remote_packets_received,
                    is_playing: Some(o.is_playing),
                    step_time: o.step_time,
                    latency_quality: o.latency.map(|l| policy.quality.latency.rate(l)),
                    jitter_quality: jitter.map(|j| policy.quality.jitter.rate(j)),
                    ..NetworkQualitySample::new(now, o.hostname.clone())
                }
            })
            .collect();
        self.write(&samples)
    }

    pub fn get_status(&self) -> NetworkQualityStatus {
        self.get_status_at(unix_now())
    }

    /// Per-host quality over the last hour of raw samples, plus a cross-host summary.
    pub fn get_status_at(&self, now: i64) -> NetworkQualityStatus {
        let raw = self.read_raw(now - STATUS_WINDOW_SECS);
        let hosts = self.policy().aggregate_hosts(&raw);

        let avg = |values: Vec<f64>, precision: u32| {
            math::mean(&values).map(|v| math::round_to(v, precision))
        };
        let summary = QualitySummary {
            avg_latency: avg(hosts.iter().filter_map(|h| h.latency_avg).collect(), 1),
            avg_jitter: avg(hosts.iter().filter_map(|h| h.jitter_avg).collect(), 2),
            avg_packet_loss: avg(hosts.iter().filter_map(|h| h.packet_loss_pct).collect(), 2),
            overall_quality: hosts
                .iter()
                .map(|h| h.overall_quality)
                .max()
                .map_or_else(|| "unknown".to_string(), |q: QualityRating| q.to_string()),
        };
        NetworkQualityStatus {
            success: true,
            timestamp: now,
            hosts,
            summary,
        }
    }
}
