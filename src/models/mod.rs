// Domain models: raw samples and rollup records per metric domain, plus query responses.

mod channel;
mod multisync;
mod network_quality;
mod ping;
mod port;
mod response;
mod voltage;

pub use channel::{ChannelSummary, ChannelValue};
pub use multisync::{MultiSyncPingRollup, MultiSyncPingSample};
pub use network_quality::{NetworkQualityRollup, NetworkQualitySample};
pub use ping::{PingRollup, PingSample, PingStatus};
pub use port::{PortRollup, PortSample, TOTAL_PORT};
pub use response::{MetricsResponse, Period, RawMetricsResponse, TierDescription, TierInfo};
pub use voltage::{LEGACY_RAIL, VoltageRollup, VoltageSample};

/// Anything persisted in a metrics log carries a Unix timestamp (seconds).
pub trait Timestamped {
    fn timestamp(&self) -> i64;
}

/// Minimal view of a log entry: only the timestamp. Used where the rest of the record is irrelevant
/// (rotation, cursor recovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Stamp {
    pub timestamp: i64,
}

impl Timestamped for Stamp {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

macro_rules! impl_timestamped {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Timestamped for $ty {
                fn timestamp(&self) -> i64 {
                    self.timestamp
                }
            }
        )*
    };
}

impl_timestamped!(
    PingSample,
    PingRollup,
    MultiSyncPingSample,
    MultiSyncPingRollup,
    NetworkQualitySample,
    NetworkQualityRollup,
    VoltageSample,
    VoltageRollup,
    PortSample,
    PortRollup,
);
