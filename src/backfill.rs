// One-time backfill: run one rollup pass at startup so buckets that elapsed while the
// process was down are compacted before the first scheduled tick.

use std::sync::Arc;

use tracing::info;

use crate::collectors::CollectorSet;
use crate::rollup_worker::run_one_tick;

/// Runs one rollup pass over every collector.
pub async fn run_backfill(collectors: Arc<CollectorSet>) -> anyhow::Result<()> {
    let records = run_one_tick(collectors).await?;
    info!(records, "backfill complete");
    Ok(())
}
