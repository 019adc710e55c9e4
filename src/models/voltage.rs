// Voltage rails. Current shape: {timestamp, voltages: {rail: volts}}.
// Legacy shape: {timestamp, voltage: volts} (core rail only). Both normalise to the rail map on read.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChannelSummary, ChannelValue};

/// Rail name given to legacy single-voltage samples.
pub const LEGACY_RAIL: &str = "core";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VoltageSampleRepr")]
pub struct VoltageSample {
    pub timestamp: i64,
    pub voltages: BTreeMap<String, ChannelValue>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VoltageSampleRepr {
    Rails {
        timestamp: i64,
        voltages: BTreeMap<String, ChannelValue>,
    },
    Legacy {
        timestamp: i64,
        voltage: ChannelValue,
    },
}

impl From<VoltageSampleRepr> for VoltageSample {
    fn from(repr: VoltageSampleRepr) -> Self {
        match repr {
            VoltageSampleRepr::Rails {
                timestamp,
                voltages,
            } => Self {
                timestamp,
                voltages,
            },
            VoltageSampleRepr::Legacy { timestamp, voltage } => Self {
                timestamp,
                voltages: BTreeMap::from([(LEGACY_RAIL.to_string(), voltage)]),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoltageRollup {
    pub timestamp: i64,
    pub period_start: i64,
    pub period_end: i64,
    pub interval: i64,
    pub voltages: BTreeMap<String, ChannelSummary>,
}
