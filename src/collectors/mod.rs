// Domain collectors and the set of enabled ones the scheduler drives.

mod channels;
pub mod multisync;
pub mod network_quality;
pub mod ping;
pub mod port;
pub mod voltage;

pub use multisync::{MultiSyncPingCollector, MultiSyncPingPolicy, PingObservation};
pub use network_quality::{
    NetworkQualityCollector, NetworkQualityPolicy, NetworkQualityStatus, QualityObservation,
    QualitySummary,
};
pub use ping::{PingCollector, PingPolicy};
pub use port::{PortCollector, PortPolicy};
pub use voltage::{VoltageCollector, VoltagePolicy};

use tracing::{info, warn};

use crate::collector::{RollupReport, RollupTarget};
use crate::config::{AppConfig, hours_to_secs};
use crate::storage::StorageError;

pub const PING_DIR: &str = "ping";
pub const MULTISYNC_DIR: &str = "multisync-ping";
pub const NETWORK_QUALITY_DIR: &str = "network-quality";
pub const VOLTAGE_DIR: &str = "voltage";
pub const EFUSE_DIR: &str = "efuse";

/// Every enabled collector, in a fixed order.
pub struct CollectorSet {
    collectors: Vec<Box<dyn RollupTarget>>,
}

impl CollectorSet {
    pub fn new(collectors: Vec<Box<dyn RollupTarget>>) -> Self {
        Self { collectors }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let storage = &config.storage;
        let mut collectors: Vec<Box<dyn RollupTarget>> = Vec::new();
        if config.ping.enabled {
            collectors.push(Box::new(PingCollector::ping(
                storage.collector_dir(PING_DIR),
                hours_to_secs(config.ping.raw_retention_hours),
            )));
        }
        if config.multisync_ping.enabled {
            collectors.push(Box::new(MultiSyncPingCollector::multisync(
                storage.collector_dir(MULTISYNC_DIR),
                hours_to_secs(config.multisync_ping.raw_retention_hours),
            )));
        }
        if config.network_quality.enabled {
            let nq = &config.network_quality;
            collectors.push(Box::new(NetworkQualityCollector::network_quality(
                storage.collector_dir(NETWORK_QUALITY_DIR),
                NetworkQualityPolicy::new(config.quality, nq.default_sync_rate, nq.frames_per_sync),
                hours_to_secs(nq.raw_retention_hours),
            )));
        }
        if config.voltage.enabled {
            collectors.push(Box::new(VoltageCollector::voltage(
                storage.collector_dir(VOLTAGE_DIR),
                config.voltage.retention_days,
                hours_to_secs(config.voltage.raw_retention_hours),
            )));
        }
        if config.efuse.enabled {
            collectors.push(Box::new(PortCollector::efuse(
                storage.collector_dir(EFUSE_DIR),
                config.efuse.retention_days,
                hours_to_secs(config.efuse.raw_retention_hours),
            )));
        }
        Self { collectors }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Creates directories and initial state for every collector.
    pub fn init_at(&self, now: i64) -> Result<(), StorageError> {
        for collector in &self.collectors {
            collector.init_at(now)?;
        }
        Ok(())
    }

    /// One rollup pass over every collector. Returns the number of rollup records appended.
    pub fn run_rollup_at(&self, now: i64) -> usize {
        let mut records = 0;
        for collector in &self.collectors {
            let report: RollupReport = collector.process_rollup_at(now);
            if !report.failed.is_empty() {
                warn!(collector = collector.name(), failed = ?report.failed, "rollup pass incomplete");
            }
            if report.raw_rotation.purged > 0 {
                info!(
                    collector = collector.name(),
                    purged = report.raw_rotation.purged,
                    kept = report.raw_rotation.kept,
                    "raw log rotated"
                );
            }
            records += report.records();
        }
        records
    }
}
