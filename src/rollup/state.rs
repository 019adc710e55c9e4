// Persisted per-tier cursors (rollup-state.json). Missing or partial entries are backfilled,
// a file that does not parse is rebuilt fresh.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::Path;

use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::tiers::TierSet;
use crate::storage::{StorageError, truncate_and_write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierState {
    /// Newest raw timestamp already consumed by this tier.
    pub last_processed: i64,
    /// Exclusive end of the newest bucket already emitted.
    pub last_bucket_end: i64,
    /// When the tier was last attempted; throttles attempts to once per interval.
    pub last_rollup: i64,
}

impl TierState {
    pub fn fresh(now: i64) -> Self {
        Self {
            last_processed: 0,
            last_bucket_end: 0,
            last_rollup: now,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct PartialTierState {
    last_processed: Option<i64>,
    last_bucket_end: Option<i64>,
    last_rollup: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RollupState {
    tiers: BTreeMap<String, TierState>,
}

impl RollupState {
    pub fn fresh(tiers: &TierSet, now: i64) -> Self {
        Self {
            tiers: tiers
                .tiers()
                .iter()
                .map(|t| (t.name.to_string(), TierState::fresh(now)))
                .collect(),
        }
    }

    pub fn tier(&self, name: &str) -> Option<&TierState> {
        self.tiers.get(name)
    }

    /// State for `name`, created fresh when absent.
    pub fn tier_mut(&mut self, name: &str, now: i64) -> &mut TierState {
        self.tiers
            .entry(name.to_string())
            .or_insert_with(|| TierState::fresh(now))
    }

    pub fn set(&mut self, name: &str, state: TierState) {
        self.tiers.insert(name.to_string(), state);
    }

    /// Loads state from `path`. A missing, empty or corrupted file yields fresh state, which is
    /// written back. Tiers absent from the file, or missing fields, are backfilled.
    pub fn load_at(path: &Path, tiers: &TierSet, now: i64) -> Result<Self, StorageError> {
        let text = read_shared(path)?;

        if text.trim().is_empty() {
            let state = Self::fresh(tiers, now);
            state.save(path)?;
            return Ok(state);
        }

        let parsed: BTreeMap<String, PartialTierState> = match serde_json::from_str(&text) {
            Ok(p) => p,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupted rollup state file; rebuilding fresh state");
                let state = Self::fresh(tiers, now);
                state.save(path)?;
                return Ok(state);
            }
        };
        if parsed.is_empty() {
            warn!(path = %path.display(), "empty rollup state file; rebuilding fresh state");
            let state = Self::fresh(tiers, now);
            state.save(path)?;
            return Ok(state);
        }

        let mut state = Self {
            tiers: parsed
                .into_iter()
                .map(|(name, p)| {
                    let tier = TierState {
                        last_processed: p.last_processed.unwrap_or(0),
                        last_bucket_end: p.last_bucket_end.unwrap_or(0),
                        last_rollup: p.last_rollup.unwrap_or(now),
                    };
                    (name, tier)
                })
                .collect(),
        };
        for tier in tiers.tiers() {
            state.tier_mut(tier.name, now);
        }
        Ok(state)
    }

    /// Truncate-then-write under an exclusive lock.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(StorageError::io(path))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write().map_err(StorageError::io(path))?;
        let file: &mut File = &mut guard;
        truncate_and_write(file, json.as_bytes()).map_err(StorageError::io(path))?;
        Ok(())
    }
}

/// Whole file under a shared lock. A missing file reads as empty.
fn read_shared(path: &Path) -> Result<String, StorageError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(String::new()),
        Err(e) => return Err(StorageError::io(path)(e)),
    };
    let lock = RwLock::new(file);
    let guard = lock.read().map_err(StorageError::io(path))?;
    let mut text = String::new();
    (&*guard)
        .read_to_string(&mut text)
        .map_err(StorageError::io(path))?;
    Ok(text)
}
