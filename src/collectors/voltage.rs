// Voltage rails. Tier set depends on the configured retention budget.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::channels::{ChannelRounding, aggregate_channels, only_key};
use crate::collector::{MetricsCollector, RollupPolicy};
use crate::models::{ChannelValue, VoltageRollup, VoltageSample};
use crate::rollup::{Aggregated, TierSet};

pub const DEFAULT_RETENTION_DAYS: u32 = 1;

const ROUNDING: ChannelRounding = ChannelRounding {
    avg: 4,
    extrema: Some(4),
    track_peak: false,
};

#[derive(Debug, Clone, Copy)]
pub struct VoltagePolicy {
    retention_days: u32,
}

impl VoltagePolicy {
    pub fn new(retention_days: u32) -> Self {
        Self {
            retention_days: retention_days.max(1),
        }
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }
}

impl Default for VoltagePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

pub type VoltageCollector = MetricsCollector<VoltagePolicy>;

impl MetricsCollector<VoltagePolicy> {
    pub fn voltage(dir: impl Into<PathBuf>, retention_days: u32, raw_retention_secs: i64) -> Self {
        Self::new(VoltagePolicy::new(retention_days), dir, raw_retention_secs)
    }

    /// Appends one reading per rail taken at `now`.
    pub fn write_voltages(&self, rails: &BTreeMap<String, f64>, now: i64) -> bool {
        if rails.is_empty() {
            return true;
        }
        self.write_one(VoltageSample {
            timestamp: now,
            voltages: rails
                .iter()
                .map(|(rail, &v)| (rail.clone(), ChannelValue::Reading(v)))
                .collect(),
        })
    }
}

impl RollupPolicy for VoltagePolicy {
    type Sample = VoltageSample;
    type Record = VoltageRollup;

    const NAME: &'static str = "voltage";

    fn aggregate_for_rollup(
        &self,
        samples: &[VoltageSample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<VoltageRollup> {
        let voltages = aggregate_channels(samples.iter().map(|s| &s.voltages), ROUNDING);
        if voltages.is_empty() {
            return Aggregated::Empty;
        }
        Aggregated::Single(VoltageRollup {
            timestamp: bucket_start,
            period_start: bucket_start,
            period_end: bucket_start + interval,
            interval,
            voltages,
        })
    }

    fn tier_set(&self) -> TierSet {
        TierSet::voltage(self.retention_days)
    }

    fn filter_sample(&self, sample: VoltageSample, rail: &str) -> Option<VoltageSample> {
        Some(VoltageSample {
            voltages: only_key(&sample.voltages, rail)?,
            ..sample
        })
    }

    fn filter_record(&self, record: VoltageRollup, rail: &str) -> Option<VoltageRollup> {
        Some(VoltageRollup {
            voltages: only_key(&record.voltages, rail)?,
            ..record
        })
    }
}
