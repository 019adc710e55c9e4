// Multi-sync ping: latency and RFC 3550 jitter per remote host, one rollup record per host.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::collector::{MetricsCollector, RollupPolicy};
use crate::models::{MultiSyncPingRollup, MultiSyncPingSample, PingStatus};
use crate::rollup::{Aggregated, JitterTracker, aggregate_latencies, math};

const LATENCY_PRECISION: u32 = 3;
const JITTER_PRECISION: u32 = 2;
const UNKNOWN_HOST: &str = "unknown";

/// Outcome of probing one remote system.
#[derive(Debug, Clone, PartialEq)]
pub struct PingObservation {
    pub hostname: String,
    pub address: String,
    pub latency: Option<f64>,
    pub success: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MultiSyncPingPolicy {
    jitter: JitterTracker,
}

pub type MultiSyncPingCollector = MetricsCollector<MultiSyncPingPolicy>;

impl MetricsCollector<MultiSyncPingPolicy> {
    pub fn multisync(dir: impl Into<PathBuf>, raw_retention_secs: i64) -> Self {
        Self::new(MultiSyncPingPolicy::default(), dir, raw_retention_secs)
    }

    /// Stamps each observation with its host's running jitter and appends the batch.
    /// Observations without an address are skipped.
    pub fn record_results(&mut self, results: &[PingObservation], now: i64) -> bool {
        let jitter = &mut self.policy_mut().jitter;
        let samples: Vec<MultiSyncPingSample> = results
            .iter()
            .filter(|r| !r.address.is_empty())
            .map(|r| {
                let sample_jitter = match (r.success, r.latency) {
                    (true, Some(latency)) => jitter.calculate_rfc3550(&r.hostname, latency),
                    _ => None,
                };
                MultiSyncPingSample {
                    timestamp: now,
                    hostname: Some(r.hostname.clone()),
                    address: Some(r.address.clone()),
                    latency: r.latency,
                    jitter: sample_jitter,
                    status: Some(if r.success {
                        PingStatus::Success
                    } else {
                        PingStatus::Failure
                    }),
                }
            })
            .collect();
        self.write(&samples)
    }
}

#[derive(Default)]
struct HostBucket {
    address: String,
    latencies: Vec<f64>,
    jitters: Vec<f64>,
    success_count: u64,
    failure_count: u64,
}

impl RollupPolicy for MultiSyncPingPolicy {
    type Sample = MultiSyncPingSample;
    type Record = MultiSyncPingRollup;

    const NAME: &'static str = "multisync-ping";

    fn aggregate_for_rollup(
        &self,
        samples: &[MultiSyncPingSample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<MultiSyncPingRollup> {
        let mut by_host: BTreeMap<&str, HostBucket> = BTreeMap::new();
        for sample in samples {
            let host = sample.hostname.as_deref().unwrap_or(UNKNOWN_HOST);
            let bucket = by_host.entry(host).or_insert_with(|| HostBucket {
                address: sample.address.clone().unwrap_or_default(),
                ..HostBucket::default()
            });
            bucket.latencies.extend(sample.latency);
            bucket.jitters.extend(sample.jitter);
            if sample.status == Some(PingStatus::Success) {
                bucket.success_count += 1;
            } else {
                bucket.failure_count += 1;
            }
        }

        by_host
            .into_iter()
            .map(|(host, bucket)| {
                let stats = aggregate_latencies(&bucket.latencies, LATENCY_PRECISION, false);
                MultiSyncPingRollup {
                    timestamp: bucket_start,
                    period_start: bucket_start,
                    period_end: bucket_start + interval,
                    hostname: host.to_string(),
                    address: bucket.address,
                    sample_count: bucket.success_count + bucket.failure_count,
                    success_count: bucket.success_count,
                    failure_count: bucket.failure_count,
                    min_latency: stats.min,
                    max_latency: stats.max,
                    avg_latency: stats.avg,
                    avg_jitter: math::mean(&bucket.jitters)
                        .map(|j| math::round_to(j, JITTER_PRECISION)),
                    max_jitter: bucket
                        .jitters
                        .iter()
                        .copied()
                        .reduce(f64::max)
                        .map(|j| math::round_to(j, JITTER_PRECISION)),
                }
            })
            .collect::<Vec<_>>()
            .into()
    }

    fn filter_sample(&self, sample: MultiSyncPingSample, host: &str) -> Option<MultiSyncPingSample> {
        (sample.hostname.as_deref() == Some(host)).then_some(sample)
    }

    fn filter_record(&self, record: MultiSyncPingRollup, host: &str) -> Option<MultiSyncPingRollup> {
        (record.hostname == host).then_some(record)
    }

    fn record_entity<'a>(&self, record: &'a MultiSyncPingRollup) -> Option<&'a str> {
        Some(&record.hostname)
    }
}
