use std::sync::Arc;

use anyhow::Result;
use tiered_metrics::*;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!("starting {}", version::banner());

    let app_config = config::AppConfig::load()?;
    let collectors = Arc::new(collectors::CollectorSet::from_config(&app_config));
    if collectors.is_empty() {
        tracing::warn!("no collectors enabled; nothing to do");
        return Ok(());
    }
    collectors
        .init_at(rollup::unix_now())
        .map_err(|e| anyhow::anyhow!("collector init: {}", e))?;
    tracing::info!(
        data_dir = %app_config.storage.data_dir.display(),
        collectors = ?collectors.names(),
        "collectors ready"
    );

    backfill::run_backfill(collectors.clone()).await?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = rollup_worker::spawn(
        collectors,
        rollup_worker::RollupWorkerConfig::from(&app_config.rollup),
        shutdown_rx,
    );

    shutdown_signal().await;
    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
