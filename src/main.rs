use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use epidaily::config::{Config, FIRST_REPORT_JSON};
use epidaily::scheduler;
use epidaily::server;
use epidaily::server::alias::AliasRegistry;
use epidaily::server::monitor::MonitorHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = Arc::new(Config::from_env());
    std::fs::create_dir_all(&cfg.public_path)
        .with_context(|| format!("creating public dir {}", cfg.public_path.display()))?;

    let registry = Arc::new(AliasRegistry::new(cfg.converted_path.join(FIRST_REPORT_JSON)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(signal_listener(shutdown_tx));

    let (monitor, _monitor_task) = MonitorHandle::spawn(shutdown_rx.clone());

    // First cycle runs before the server binds, matching the data the
    // routes advertise from the very first request.
    let mut startup_shutdown = shutdown_rx.clone();
    scheduler::run_cycle(&cfg, &registry, &mut startup_shutdown, true).await;
    registry.rotate(&cfg.converted_path);

    tokio::spawn(scheduler::run_update_loop(
        cfg.clone(),
        registry.clone(),
        shutdown_rx.clone(),
    ));

    let app = server::build_router(&cfg, registry, monitor);
    server::serve(&cfg.bind_addr, app, shutdown_rx)
        .await
        .context("server failed")?;

    info!("shutdown complete");
    Ok(())
}

/// Flips the shutdown watch on SIGINT or SIGTERM.
async fn signal_listener(shutdown_tx: watch::Sender<bool>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                tracing::error!(error = %err, "SIGTERM handler unavailable");
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
            _ = sigterm.recv() => info!("SIGTERM received"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("ctrl-c received");
    }
    let _ = shutdown_tx.send(true);
}
