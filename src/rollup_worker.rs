// Background worker: runs one rollup pass over every enabled collector per tick.
// Ticks come from a fixed interval, or from a cron schedule (local time) when one is configured.
// Each pass is synchronous file I/O and runs on the blocking pool.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::collectors::CollectorSet;
use crate::rollup::unix_now;

/// Config for the rollup worker.
#[derive(Debug, Clone)]
pub struct RollupWorkerConfig {
    pub interval_secs: u64,
    /// Optional cron expression for ticks (e.g. "0 * * * * *" = top of every minute). Uses local time.
    pub schedule: Option<String>,
}

impl From<&crate::config::RollupConfig> for RollupWorkerConfig {
    fn from(c: &crate::config::RollupConfig) -> Self {
        Self {
            interval_secs: c.interval_secs,
            schedule: c.schedule.clone(),
        }
    }
}

/// Spawns the rollup worker. It stops after the current tick once `shutdown_rx` fires.
pub fn spawn(
    collectors: Arc<CollectorSet>,
    config: RollupWorkerConfig,
    shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(collectors, config, shutdown_rx).await;
    })
}

#[instrument(skip(collectors, shutdown_rx), fields(interval_secs = config.interval_secs))]
async fn run(
    collectors: Arc<CollectorSet>,
    config: RollupWorkerConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let (tick_tx, mut tick_rx) = mpsc::channel::<()>(1);
    let scheduler = tokio::spawn(tick_scheduler(config, tick_tx));

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                info!("rollup worker stopping");
                break;
            }
            tick = tick_rx.recv() => {
                if tick.is_none() {
                    warn!("rollup scheduler ended; worker stopping");
                    break;
                }
                if let Err(e) = run_one_tick(collectors.clone()).await {
                    warn!(error = %e, "rollup tick failed");
                }
            }
        }
    }
    scheduler.abort();
}

/// Sends a message on `tx` at each tick (cron or fixed interval). Uses local time for cron.
async fn tick_scheduler(config: RollupWorkerConfig, tx: mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid rollup schedule; rollups will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}

/// Runs one rollup pass over every collector. Used by the worker loop and by backfill.
pub async fn run_one_tick(collectors: Arc<CollectorSet>) -> anyhow::Result<usize> {
    let records =
        tokio::task::spawn_blocking(move || collectors.run_rollup_at(unix_now())).await?;
    if records > 0 {
        info!(records, "rollup tick");
    } else {
        debug!("rollup tick: nothing new");
    }
    Ok(records)
}
