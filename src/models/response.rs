// Structured results handed to callers (scheduler, HTTP layer). Failures are values, never panics.

use serde::{Deserialize, Serialize};

/// Which tier answered a rollup query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierInfo {
    pub tier: String,
    pub interval: i64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: i64,
    pub end: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsResponse<R> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    pub data: Vec<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier_info: Option<TierInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<R> MetricsResponse<R> {
    pub fn found(data: Vec<R>, tier_info: TierInfo, period: Period) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
            tier_info: Some(tier_info),
            period: Some(period),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: None,
            data: Vec::new(),
            tier_info: None,
            period: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricsResponse<S> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<S>,
    pub period: Period,
    /// Entity filter that was applied (host, rail or port), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// Operational description of one configured tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDescription {
    pub interval: i64,
    pub interval_label: String,
    pub retention: i64,
    pub retention_label: String,
    pub label: String,
    pub file_exists: bool,
    pub file_size: u64,
}
