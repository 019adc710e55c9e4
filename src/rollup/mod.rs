// Tiered rollup engine: tier tables, persisted cursors, shared math and the per-tier
// bucket processor that compacts a raw log into one rollup file per tier.

pub mod math;
mod processor;
pub mod state;
pub mod tiers;

pub use math::{
    JitterSummary, JitterTracker, LatencyStats, QualityConfig, QualityRating, QualityThresholds,
    aggregate_latencies, calculate_jitter_from_latencies, overall_quality_rating, round_to,
};
pub use processor::{Aggregated, RollupProcessor, TierOutcome};
pub use state::{RollupState, TierState};
pub use tiers::{TierConfig, TierSet, format_duration, format_interval};

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
