// Per-tier compaction: group raw samples into fully elapsed buckets past the tier cursor,
// aggregate each bucket once, append the records, then advance and persist the cursor.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::state::RollupState;
use super::tiers::{TierConfig, TierSet, format_duration, format_interval};
use crate::models::{Stamp, TierDescription, Timestamped};
use crate::storage::{BACKUP_SUFFIX, MetricsStorage, StorageError};

/// What a domain aggregation produced for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated<R> {
    /// Nothing meaningful in the bucket.
    Empty,
    Single(R),
    /// One record per entity (host, rail, port), all sharing the bucket timestamps.
    PerEntity(Vec<R>),
}

impl<R> Aggregated<R> {
    pub fn into_records(self) -> Vec<R> {
        match self {
            Aggregated::Empty => Vec::new(),
            Aggregated::Single(r) => vec![r],
            Aggregated::PerEntity(rs) => rs,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Aggregated::Empty => true,
            Aggregated::Single(_) => false,
            Aggregated::PerEntity(rs) => rs.is_empty(),
        }
    }
}

impl<R> From<Option<R>> for Aggregated<R> {
    fn from(r: Option<R>) -> Self {
        r.map_or(Aggregated::Empty, Aggregated::Single)
    }
}

impl<R> From<Vec<R>> for Aggregated<R> {
    fn from(rs: Vec<R>) -> Self {
        if rs.is_empty() {
            Aggregated::Empty
        } else {
            Aggregated::PerEntity(rs)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierOutcome {
    /// Attempted again before a full interval passed since the last attempt.
    Throttled,
    /// No raw samples past the cursor.
    Idle,
    Processed { buckets: usize, records: usize },
}

#[derive(Debug, Clone)]
pub struct RollupProcessor {
    tiers: TierSet,
    storage: MetricsStorage,
}

impl RollupProcessor {
    pub fn new(tiers: TierSet) -> Self {
        Self {
            tiers,
            storage: MetricsStorage::new(),
        }
    }

    pub fn tiers(&self) -> &TierSet {
        &self.tiers
    }

    pub fn storage(&self) -> &MetricsStorage {
        &self.storage
    }

    pub fn best_tier_for_hours(&self, hours_back: u32) -> &TierConfig {
        self.tiers.best_tier_for_hours(hours_back)
    }

    pub fn get_state(&self, path: &Path) -> Result<RollupState, StorageError> {
        self.get_state_at(path, super::unix_now())
    }

    pub fn get_state_at(&self, path: &Path, now: i64) -> Result<RollupState, StorageError> {
        RollupState::load_at(path, &self.tiers, now)
    }

    pub fn save_state(&self, path: &Path, state: &RollupState) -> Result<(), StorageError> {
        state.save(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "unable to write rollup state file");
        })
    }

    /// Labels, retention and on-disk presence of every tier.
    pub fn tiers_info(
        &self,
        file_path: impl Fn(&TierConfig) -> PathBuf,
    ) -> BTreeMap<String, TierDescription> {
        self.tiers
            .tiers()
            .iter()
            .map(|tier| {
                let meta = fs::metadata(file_path(tier)).ok();
                let description = TierDescription {
                    interval: tier.interval_secs,
                    interval_label: format_interval(tier.interval_secs),
                    retention: tier.retention_secs,
                    retention_label: format_duration(tier.retention_secs),
                    label: tier.label.to_string(),
                    file_exists: meta.is_some(),
                    file_size: meta.map_or(0, |m| m.len()),
                };
                (tier.name.to_string(), description)
            })
            .collect()
    }

    /// Runs one compaction pass of `tier` at time `now`.
    ///
    /// A bucket `[b, b + interval)` is aggregated only when `b + interval <= now - 1` and it ends
    /// after the tier's `last_bucket_end`. Every such bucket is consumed even if the aggregation
    /// comes back empty. State is written only after the records are appended.
    #[instrument(skip(self, aggregate), fields(operation = "process_tier", tier = tier.name))]
    pub fn process_tier_at<S, R, F>(
        &self,
        tier: &TierConfig,
        state_path: &Path,
        raw_path: &Path,
        rollup_path: &Path,
        mut aggregate: F,
        now: i64,
    ) -> Result<TierOutcome, StorageError>
    where
        S: DeserializeOwned + Timestamped,
        R: Serialize + Timestamped,
        F: FnMut(&[S], i64, i64) -> Aggregated<R>,
    {
        let mut state = self.get_state_at(state_path, now)?;
        let mut cursor = *state.tier_mut(tier.name, now);
        let interval = tier.interval_secs;

        if now - cursor.last_rollup < interval {
            return Ok(TierOutcome::Throttled);
        }

        // Records at or past the cursor mean an earlier append landed but its state save did not.
        let already_emitted = self
            .storage
            .read::<Stamp>(rollup_path, cursor.last_bucket_end - 1)?
            .last()
            .map(|s| tier.bucket_start(s.timestamp) + interval);
        if let Some(end) = already_emitted
            && end > cursor.last_bucket_end
        {
            warn!(
                last_bucket_end = cursor.last_bucket_end,
                recovered = end,
                "rollup cursor behind tier file; advancing"
            );
            cursor.last_bucket_end = end;
        }

        let raw: Vec<S> = self.storage.read(raw_path, cursor.last_processed)?;
        if raw.is_empty() {
            cursor.last_rollup = now;
            state.set(tier.name, cursor);
            self.save_state(state_path, &state)?;
            return Ok(TierOutcome::Idle);
        }

        let mut buckets: BTreeMap<i64, Vec<S>> = BTreeMap::new();
        for sample in raw {
            buckets
                .entry(tier.bucket_start(sample.timestamp()))
                .or_default()
                .push(sample);
        }

        let cutoff = now - 1;
        let mut records: Vec<R> = Vec::new();
        let mut consumed = 0usize;
        let mut newest_end = cursor.last_bucket_end;
        let mut newest_sample = cursor.last_processed;
        for (&start, samples) in &buckets {
            let end = start + interval;
            if end <= cursor.last_bucket_end || end > cutoff {
                continue;
            }
            records.extend(aggregate(samples.as_slice(), start, interval).into_records());
            consumed += 1;
            newest_end = newest_end.max(end);
            if let Some(ts) = samples.iter().map(Timestamped::timestamp).max() {
                newest_sample = newest_sample.max(ts);
            }
        }

        if !records.is_empty() {
            self.storage.write_batch(rollup_path, &records)?;
        }

        cursor.last_processed = newest_sample;
        cursor.last_bucket_end = newest_end;
        cursor.last_rollup = now;
        state.set(tier.name, cursor);
        self.save_state(state_path, &state)?;

        if consumed > 0 {
            info!(
                buckets = consumed,
                records = records.len(),
                "rollup appended"
            );
        } else {
            debug!("no complete buckets");
        }

        if let Err(e) = self
            .storage
            .rotate_at(rollup_path, tier.retention_secs, BACKUP_SUFFIX, now)
        {
            warn!(path = %rollup_path.display(), error = %e, "rollup rotation failed");
        }

        Ok(TierOutcome::Processed {
            buckets: consumed,
            records: records.len(),
        })
    }
}
