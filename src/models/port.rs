// eFuse port current (mA) per output port; `_total` is an ordinary key holding the sum.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ChannelSummary, ChannelValue};

/// Key under which the sum of all ports is stored.
pub const TOTAL_PORT: &str = "_total";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSample {
    pub timestamp: i64,
    #[serde(default)]
    pub ports: BTreeMap<String, ChannelValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRollup {
    pub timestamp: i64,
    pub period_start: i64,
    pub period_end: i64,
    pub interval: i64,
    pub ports: BTreeMap<String, ChannelSummary>,
}
