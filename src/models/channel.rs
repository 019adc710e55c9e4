// Per-channel values for multi-key samples (voltage rails, efuse ports).
// A channel is either a single reading (raw sample) or an already-aggregated summary
// (rollup-shaped input); both read from the same JSON map.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Reading(f64),
    Summary(ChannelSummary),
}

impl ChannelValue {
    /// A raw reading is a one-sample summary of itself.
    pub fn as_summary(&self) -> ChannelSummary {
        match *self {
            ChannelValue::Reading(v) => ChannelSummary {
                avg: v,
                min: v,
                max: v,
                peak: None,
                samples: 1,
            },
            ChannelValue::Summary(s) => s,
        }
    }
}

impl From<f64> for ChannelValue {
    fn from(v: f64) -> Self {
        ChannelValue::Reading(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Highest max seen across every bucket folded into this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<f64>,
    #[serde(default = "one")]
    pub samples: u64,
}

fn one() -> u64 {
    1
}
