// eFuse port current (mA). `_total` is written alongside the ports and rolls up like any port.

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::channels::{ChannelRounding, aggregate_channels, only_key};
use crate::collector::{MetricsCollector, RollupPolicy};
use crate::models::{ChannelValue, PortRollup, PortSample, TOTAL_PORT};
use crate::rollup::tiers::DAY;
use crate::rollup::{Aggregated, TierSet};

pub const DEFAULT_RETENTION_DAYS: u32 = 7;

const ROUNDING: ChannelRounding = ChannelRounding {
    avg: 0,
    extrema: None,
    track_peak: true,
};

#[derive(Debug, Clone, Copy)]
pub struct PortPolicy {
    retention_days: u32,
}

impl PortPolicy {
    pub fn new(retention_days: u32) -> Self {
        Self {
            retention_days: retention_days.max(1),
        }
    }
}

impl Default for PortPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_DAYS)
    }
}

pub type PortCollector = MetricsCollector<PortPolicy>;

impl MetricsCollector<PortPolicy> {
    pub fn efuse(dir: impl Into<PathBuf>, retention_days: u32, raw_retention_secs: i64) -> Self {
        Self::new(PortPolicy::new(retention_days), dir, raw_retention_secs)
    }

    /// Appends per-port readings taken at `now`, adding `_total` unless the caller supplied it.
    pub fn write_ports(&self, readings: &BTreeMap<String, f64>, now: i64) -> bool {
        if readings.is_empty() {
            return true;
        }
        let mut ports: BTreeMap<String, ChannelValue> = readings
            .iter()
            .map(|(port, &ma)| (port.clone(), ChannelValue::Reading(ma)))
            .collect();
        if !ports.contains_key(TOTAL_PORT) {
            let total: f64 = readings.values().sum();
            ports.insert(TOTAL_PORT.to_string(), ChannelValue::Reading(total));
        }
        self.write_one(PortSample {
            timestamp: now,
            ports,
        })
    }
}

impl RollupPolicy for PortPolicy {
    type Sample = PortSample;
    type Record = PortRollup;

    const NAME: &'static str = "efuse";

    fn aggregate_for_rollup(
        &self,
        samples: &[PortSample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<PortRollup> {
        let ports = aggregate_channels(samples.iter().map(|s| &s.ports), ROUNDING);
        if ports.is_empty() {
            return Aggregated::Empty;
        }
        Aggregated::Single(PortRollup {
            timestamp: bucket_start,
            period_start: bucket_start,
            period_end: bucket_start + interval,
            interval,
            ports,
        })
    }

    fn tier_set(&self) -> TierSet {
        TierSet::capped(i64::from(self.retention_days) * DAY)
    }

    fn filter_sample(&self, sample: PortSample, port: &str) -> Option<PortSample> {
        Some(PortSample {
            ports: only_key(&sample.ports, port)?,
            ..sample
        })
    }

    fn filter_record(&self, record: PortRollup, port: &str) -> Option<PortRollup> {
        Some(PortRollup {
            ports: only_key(&record.ports, port)?,
            ..record
        })
    }
}
