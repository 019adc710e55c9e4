// Generic collector: binds one raw log, a tier set and a domain aggregation policy to
// MetricsStorage and RollupProcessor. Every operation returns a structured result; failures
// are logged here and never propagate to the caller.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::models::{
    MetricsResponse, Period, RawMetricsResponse, TierDescription, TierInfo, Timestamped,
};
use crate::rollup::{Aggregated, RollupProcessor, TierConfig, TierOutcome, TierSet, unix_now};
use crate::storage::{BACKUP_SUFFIX, RotationResult, StorageError};

pub const RAW_FILE: &str = "raw.log";
pub const STATE_FILE: &str = "rollup-state.json";

/// Domain half of a collector: record types, bucket aggregation and entity filtering.
pub trait RollupPolicy {
    type Sample: Serialize + DeserializeOwned + Timestamped + Clone;
    type Record: Serialize + DeserializeOwned + Timestamped + Clone;

    /// Used in logs and as the collector's identity.
    const NAME: &'static str;

    /// Aggregates the samples of one bucket `[bucket_start, bucket_start + interval)`.
    fn aggregate_for_rollup(
        &self,
        samples: &[Self::Sample],
        bucket_start: i64,
        interval: i64,
    ) -> Aggregated<Self::Record>;

    fn tier_set(&self) -> TierSet {
        TierSet::standard()
    }

    fn rollup_file_name(&self, tier: &TierConfig) -> String {
        format!("{}.log", tier.name)
    }

    /// Restricts a raw sample to `entity`; `None` drops it.
    fn filter_sample(&self, sample: Self::Sample, _entity: &str) -> Option<Self::Sample> {
        Some(sample)
    }

    /// Restricts a rollup record to `entity`; `None` drops it.
    fn filter_record(&self, record: Self::Record, _entity: &str) -> Option<Self::Record> {
        Some(record)
    }

    /// Secondary sort key for records sharing a timestamp.
    fn record_entity<'a>(&self, _record: &'a Self::Record) -> Option<&'a str> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorPaths {
    pub dir: PathBuf,
    pub raw: PathBuf,
    pub state: PathBuf,
}

impl CollectorPaths {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            raw: dir.join(RAW_FILE),
            state: dir.join(STATE_FILE),
            dir,
        }
    }
}

/// Result of one `process_rollup` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollupReport {
    pub tiers: BTreeMap<String, TierOutcome>,
    /// Tiers whose pass failed (logged, not propagated).
    pub failed: Vec<String>,
    pub raw_rotation: RotationResult,
}

impl RollupReport {
    pub fn records(&self) -> usize {
        self.tiers
            .values()
            .map(|o| match o {
                TierOutcome::Processed { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }
}

pub struct MetricsCollector<P: RollupPolicy> {
    policy: P,
    paths: CollectorPaths,
    processor: RollupProcessor,
    raw_retention_secs: i64,
}

impl<P: RollupPolicy> MetricsCollector<P> {
    pub fn new(policy: P, dir: impl Into<PathBuf>, raw_retention_secs: i64) -> Self {
        let processor = RollupProcessor::new(policy.tier_set());
        Self {
            policy,
            paths: CollectorPaths::in_dir(dir),
            processor,
            raw_retention_secs,
        }
    }

    pub fn name(&self) -> &'static str {
        P::NAME
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    pub fn paths(&self) -> &CollectorPaths {
        &self.paths
    }

    pub fn tiers(&self) -> &TierSet {
        self.processor.tiers()
    }

    pub fn processor(&self) -> &RollupProcessor {
        &self.processor
    }

    pub fn raw_retention_secs(&self) -> i64 {
        self.raw_retention_secs
    }

    pub fn rollup_path(&self, tier: &TierConfig) -> PathBuf {
        self.paths.dir.join(self.policy.rollup_file_name(tier))
    }

    pub fn init(&self) -> Result<(), StorageError> {
        self.init_at(unix_now())
    }

    /// Creates the collector directory and persists initial rollup state.
    pub fn init_at(&self, now: i64) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.paths.dir).map_err(StorageError::io(&self.paths.dir))?;
        let state = self.processor.get_state_at(&self.paths.state, now)?;
        self.processor.save_state(&self.paths.state, &state)?;
        info!(collector = P::NAME, dir = %self.paths.dir.display(), "collector initialised");
        Ok(())
    }

    /// Appends samples to the raw log. `false` (and a warning) on failure.
    pub fn write(&self, samples: &[P::Sample]) -> bool {
        match self
            .processor
            .storage()
            .write_batch(&self.paths.raw, samples)
        {
            Ok(()) => true,
            Err(e) => {
                warn!(collector = P::NAME, error = %e, "raw write failed");
                false
            }
        }
    }

    pub fn write_one(&self, sample: P::Sample) -> bool {
        self.write(std::slice::from_ref(&sample))
    }

    /// Raw samples newer than `since`; empty (with a warning) when the log cannot be read.
    pub fn read_raw(&self, since: i64) -> Vec<P::Sample> {
        self.processor
            .storage()
            .read(&self.paths.raw, since)
            .unwrap_or_else(|e| {
                warn!(collector = P::NAME, error = %e, "raw read failed");
                Vec::new()
            })
    }

    /// Raw samples from the last `hours` hours, optionally restricted to one entity.
    pub fn read_raw_hours(&self, hours: u32, entity: Option<&str>, now: i64) -> Vec<P::Sample> {
        let start = now - i64::from(hours) * 3600;
        self.read_raw(start - 1)
            .into_iter()
            .filter(|s| s.timestamp() <= now)
            .filter_map(|s| match entity {
                Some(e) => self.policy.filter_sample(s, e),
                None => Some(s),
            })
            .collect()
    }

    pub fn process_rollup(&self) -> RollupReport {
        self.process_rollup_at(unix_now())
    }

    /// Runs every tier once, then rotates the raw log. A failing tier is logged and skipped.
    #[instrument(skip(self), fields(collector = P::NAME, operation = "process_rollup"))]
    pub fn process_rollup_at(&self, now: i64) -> RollupReport {
        let mut report = RollupReport::default();
        for tier in self.processor.tiers().tiers() {
            let rollup_path = self.rollup_path(tier);
            let result = self.processor.process_tier_at(
                tier,
                &self.paths.state,
                &self.paths.raw,
                &rollup_path,
                |samples: &[P::Sample], start, interval| {
                    self.policy.aggregate_for_rollup(samples, start, interval)
                },
                now,
            );
            match result {
                Ok(outcome) => {
                    report.tiers.insert(tier.name.to_string(), outcome);
                }
                Err(e) => {
                    warn!(tier = tier.name, error = %e, "rollup tier failed");
                    report.failed.push(tier.name.to_string());
                }
            }
        }

        match self.processor.storage().rotate_at(
            &self.paths.raw,
            self.raw_retention_secs,
            BACKUP_SUFFIX,
            now,
        ) {
            Ok(rotation) => report.raw_rotation = rotation,
            Err(e) => warn!(error = %e, "raw rotation failed"),
        }
        report
    }

    /// Best tier for `hours`, falling back to finer tiers whose file exists when the preferred
    /// tier has not been written yet.
    pub fn select_tier(&self, hours: u32) -> &TierConfig {
        let tiers = self.processor.tiers();
        let best = tiers.best_tier_for_hours(hours);
        if self.rollup_path(best).exists() {
            return best;
        }
        let idx = tiers.position(best.name).unwrap_or(0);
        tiers.tiers()[..idx]
            .iter()
            .rev()
            .find(|t| self.rollup_path(t).exists())
            .unwrap_or(best)
    }

    pub fn get_metrics(&self, hours: u32, entity: Option<&str>) -> MetricsResponse<P::Record> {
        self.get_metrics_at(hours, entity, unix_now())
    }

    pub fn get_metrics_at(
        &self,
        hours: u32,
        entity: Option<&str>,
        now: i64,
    ) -> MetricsResponse<P::Record> {
        let tier = self.select_tier(hours);
        // Floored so the bucket straddling the window start is included.
        let start = tier.bucket_start(now - i64::from(hours) * 3600);
        let data = match self.read_rollup_data(tier, start, now, entity) {
            Ok(data) => data,
            Err(error) => return MetricsResponse::failure(error),
        };
        MetricsResponse::found(
            data,
            TierInfo {
                tier: tier.name.to_string(),
                interval: tier.interval_secs,
                label: tier.label.to_string(),
            },
            Period {
                start,
                end: now,
                hours: Some(hours),
            },
        )
    }

    /// Records of `tier` within `[start, end]`, ordered by timestamp then entity.
    pub fn read_rollup_data(
        &self,
        tier: &TierConfig,
        start: i64,
        end: i64,
        entity: Option<&str>,
    ) -> Result<Vec<P::Record>, String> {
        let path = self.rollup_path(tier);
        if !path.exists() {
            return Err("Rollup file not found".to_string());
        }
        let records: Vec<P::Record> = self
            .processor
            .storage()
            .read(&path, start - 1)
            .map_err(|e| {
                warn!(path = %path.display(), error = %e, "rollup read failed");
                "Unable to read rollup file".to_string()
            })?;
        let mut data: Vec<P::Record> = records
            .into_iter()
            .filter(|r| r.timestamp() <= end)
            .filter_map(|r| match entity {
                Some(e) => self.policy.filter_record(r, e),
                None => Some(r),
            })
            .collect();
        data.sort_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| self.policy.record_entity(a).cmp(&self.policy.record_entity(b)))
        });
        Ok(data)
    }

    pub fn get_raw_metrics(
        &self,
        hours: u32,
        entity: Option<&str>,
    ) -> RawMetricsResponse<P::Sample> {
        self.get_raw_metrics_at(hours, entity, unix_now())
    }

    pub fn get_raw_metrics_at(
        &self,
        hours: u32,
        entity: Option<&str>,
        now: i64,
    ) -> RawMetricsResponse<P::Sample> {
        let data = self.read_raw_hours(hours, entity, now);
        RawMetricsResponse {
            success: true,
            count: data.len(),
            data,
            period: Period {
                start: now - i64::from(hours) * 3600,
                end: now,
                hours: Some(hours),
            },
            entity: entity.map(str::to_string),
        }
    }

    pub fn get_rollup_tiers_info(&self) -> BTreeMap<String, TierDescription> {
        self.processor.tiers_info(|t| self.rollup_path(t))
    }
}

/// Object-safe view of a collector for the scheduler.
pub trait RollupTarget: Send + Sync {
    fn name(&self) -> &'static str;
    fn init_at(&self, now: i64) -> Result<(), StorageError>;
    fn process_rollup_at(&self, now: i64) -> RollupReport;
}

impl<P> RollupTarget for MetricsCollector<P>
where
    P: RollupPolicy + Send + Sync,
{
    fn name(&self) -> &'static str {
        P::NAME
    }

    fn init_at(&self, now: i64) -> Result<(), StorageError> {
        MetricsCollector::init_at(self, now)
    }

    fn process_rollup_at(&self, now: i64) -> RollupReport {
        MetricsCollector::process_rollup_at(self, now)
    }
}
