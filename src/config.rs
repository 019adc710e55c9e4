use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::collectors::{network_quality, port, voltage};
use crate::rollup::tiers::{DAY, HOUR};
use crate::rollup::{QualityConfig, QualityThresholds, TierSet};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub rollup: RollupConfig,
    #[serde(default)]
    pub ping: LatencyCollectorConfig,
    #[serde(default)]
    pub multisync_ping: LatencyCollectorConfig,
    #[serde(default)]
    pub network_quality: NetworkQualityConfig,
    #[serde(default)]
    pub voltage: VoltageConfig,
    #[serde(default)]
    pub efuse: EfuseConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory; each collector gets its own subdirectory.
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn collector_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RollupConfig {
    pub interval_secs: u64,
    /// Optional cron expression (local time), e.g. "0 * * * * *" = every minute. Overrides interval_secs.
    pub schedule: Option<String>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            schedule: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatencyCollectorConfig {
    pub enabled: bool,
    pub raw_retention_hours: u32,
}

impl Default for LatencyCollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            raw_retention_hours: 25,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkQualityConfig {
    pub enabled: bool,
    pub raw_retention_hours: u32,
    /// Sync packets per second assumed when the frame step time is unknown.
    pub default_sync_rate: f64,
    /// The player emits one sync packet every this many frames.
    pub frames_per_sync: u32,
}

impl Default for NetworkQualityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            raw_retention_hours: 25,
            default_sync_rate: network_quality::DEFAULT_SYNC_RATE,
            frames_per_sync: network_quality::DEFAULT_FRAMES_PER_SYNC,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoltageConfig {
    pub enabled: bool,
    pub retention_days: u32,
    pub raw_retention_hours: u32,
}

impl Default for VoltageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: voltage::DEFAULT_RETENTION_DAYS,
            raw_retention_hours: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EfuseConfig {
    pub enabled: bool,
    pub retention_days: u32,
    pub raw_retention_hours: u32,
}

impl Default for EfuseConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_days: port::DEFAULT_RETENTION_DAYS,
            raw_retention_hours: 6,
        }
    }
}

pub fn hours_to_secs(hours: u32) -> i64 {
    i64::from(hours) * HOUR
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        Self::load_from_path(Path::new(&path))
    }

    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.storage.data_dir.as_os_str().is_empty(),
            "storage.data_dir must be non-empty"
        );
        anyhow::ensure!(
            self.rollup.interval_secs > 0,
            "rollup.interval_secs must be > 0, got {}",
            self.rollup.interval_secs
        );
        if let Some(ref schedule) = self.rollup.schedule {
            anyhow::ensure!(
                schedule.parse::<cron::Schedule>().is_ok(),
                "rollup.schedule is not a valid cron expression: {}",
                schedule
            );
        }

        let tick = self.rollup.interval_secs;
        let standard = TierSet::standard().coarsest_interval();
        check_raw_retention("ping", self.ping.raw_retention_hours, standard, tick)?;
        check_raw_retention(
            "multisync_ping",
            self.multisync_ping.raw_retention_hours,
            standard,
            tick,
        )?;
        check_raw_retention(
            "network_quality",
            self.network_quality.raw_retention_hours,
            standard,
            tick,
        )?;
        anyhow::ensure!(
            self.network_quality.default_sync_rate > 0.0,
            "network_quality.default_sync_rate must be > 0, got {}",
            self.network_quality.default_sync_rate
        );
        anyhow::ensure!(
            self.network_quality.frames_per_sync > 0,
            "network_quality.frames_per_sync must be > 0, got {}",
            self.network_quality.frames_per_sync
        );

        anyhow::ensure!(
            self.voltage.retention_days > 0,
            "voltage.retention_days must be > 0, got {}",
            self.voltage.retention_days
        );
        check_raw_retention(
            "voltage",
            self.voltage.raw_retention_hours,
            TierSet::voltage(self.voltage.retention_days).coarsest_interval(),
            tick,
        )?;
        anyhow::ensure!(
            self.efuse.retention_days > 0,
            "efuse.retention_days must be > 0, got {}",
            self.efuse.retention_days
        );
        check_raw_retention(
            "efuse",
            self.efuse.raw_retention_hours,
            TierSet::capped(i64::from(self.efuse.retention_days) * DAY).coarsest_interval(),
            tick,
        )?;

        check_thresholds("quality.latency", &self.quality.latency)?;
        check_thresholds("quality.jitter", &self.quality.jitter)?;
        check_thresholds("quality.packet_loss", &self.quality.packet_loss)?;
        Ok(())
    }
}

/// Every tier reads from the raw log. A bucket `[b, b + I)` can wait until about `b + 2I`
/// plus one worker tick before it is rolled up, so raw data must outlive that.
fn check_raw_retention(
    section: &str,
    hours: u32,
    coarsest_interval: i64,
    tick_secs: u64,
) -> anyhow::Result<()> {
    let required = i64::try_from(tick_secs)
        .unwrap_or(i64::MAX)
        .saturating_add(2 * coarsest_interval);
    anyhow::ensure!(
        hours_to_secs(hours) >= required,
        "{}.raw_retention_hours must cover twice the coarsest tier interval plus one rollup interval ({}s), got {}",
        section,
        required,
        hours
    );
    Ok(())
}

fn check_thresholds(section: &str, t: &QualityThresholds) -> anyhow::Result<()> {
    anyhow::ensure!(
        t.is_ordered(),
        "{} thresholds must satisfy good <= fair <= poor, got {}/{}/{}",
        section,
        t.good,
        t.fair,
        t.poor
    );
    Ok(())
}
