// Connectivity ping: one aggregate per bucket across every probed host.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::collector::{MetricsCollector, RollupPolicy};
use crate::models::{PingRollup, PingSample, PingStatus};
use crate::rollup::{Aggregated, aggregate_latencies};

const LATENCY_PRECISION: u32 = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct PingPolicy;

pub type PingCollector = MetricsCollector<PingPolicy>;

impl MetricsCollector<PingPolicy> {
    pub fn ping(dir: impl Into<PathBuf>, raw_retention_secs: i64) -> Self {
        Self::new(PingPolicy, dir, raw_retention_secs)
    }
}

impl RollupPolicy for PingPolicy {
    type Sample = PingSample;
    type Record = PingRollup;

    const NAME: &'static str = "ping";

    fn aggregate_for_rollup(
        &self,
        samples: &[PingSample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<PingRollup> {
        if samples.is_empty() {
            return Aggregated::Empty;
        }

        let latencies: Vec<f64> = samples.iter().filter_map(|s| s.latency).collect();
        let mut hosts: BTreeMap<String, u64> = BTreeMap::new();
        let mut success_count = 0u64;
        let mut failure_count = 0u64;
        for sample in samples {
            if let Some(host) = &sample.host {
                *hosts.entry(host.clone()).or_default() += 1;
            }
            match sample.status {
                Some(PingStatus::Success) => success_count += 1,
                Some(PingStatus::Failure) => failure_count += 1,
                _ => {}
            }
        }
        let sample_count = samples.len() as u64;
        // No explicit failures recorded: everything that did not succeed counts as one.
        if failure_count == 0 {
            failure_count = sample_count - success_count;
        }

        let stats = aggregate_latencies(&latencies, LATENCY_PRECISION, false);
        Aggregated::Single(PingRollup {
            timestamp: bucket_start,
            period_start: bucket_start,
            period_end: bucket_start + interval,
            min_latency: stats.min,
            max_latency: stats.max,
            avg_latency: stats.avg,
            sample_count,
            success_count,
            failure_count,
            hosts,
        })
    }

    fn filter_sample(&self, sample: PingSample, host: &str) -> Option<PingSample> {
        (sample.host.as_deref() == Some(host)).then_some(sample)
    }

    fn filter_record(&self, record: PingRollup, host: &str) -> Option<PingRollup> {
        record.hosts.contains_key(host).then_some(record)
    }
}
