//! Ingestion cycle driver: one run at startup, then one per update
//! interval. A cycle publishes new alias targets only after every file
//! write and the summary write have succeeded; a cycle interrupted by
//! shutdown publishes nothing.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::Config;
use crate::git::{self, SyncOutcome};
use crate::pipeline;
use crate::server::alias::AliasRegistry;

/// Runs ingestion cycles until `shutdown` flips. The startup cycle is the
/// caller's job (it runs before the server binds); this loop only handles
/// the steady-state interval.
pub async fn run_update_loop(
    cfg: Arc<Config>,
    registry: Arc<AliasRegistry>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(cfg.update_cycle);
    // A cycle that overruns the interval must not be followed by a burst
    // of catch-up cycles.
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tick.tick().await; // the immediate tick; startup already ran a cycle

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("update loop stopped");
                return;
            }
            _ = tick.tick() => {
                run_cycle(&cfg, &registry, &mut shutdown, false).await;
            }
        }
    }
}

/// One sync -> convert -> publish cycle.
///
/// `startup` relaxes the sync gate: the first cycle converts whatever the
/// mirror already holds even when the network is down, so a restart keeps
/// serving data. Steady-state cycles skip conversion on `NoUpdate` (the
/// distinguished "nothing changed" outcome) and on sync failure, leaving
/// the previously published aliases untouched.
pub async fn run_cycle(
    cfg: &Config,
    registry: &AliasRegistry,
    shutdown: &mut watch::Receiver<bool>,
    startup: bool,
) {
    match git::sync_repo(&cfg.git_path, &cfg.repo_url, cfg.git_timeout).await {
        Ok(SyncOutcome::NoUpdate) if !startup => {
            info!("upstream unchanged; skipping cycle");
            return;
        }
        Ok(outcome) => info!(?outcome, "mirror synchronized"),
        Err(err) if startup => {
            warn!(error = %err, "startup sync failed; converting existing mirror");
        }
        Err(err) => {
            warn!(error = %err, "sync failed; cycle postponed to next tick");
            return;
        }
    }

    let convert_cfg = cfg.clone();
    let conversion = tokio::task::spawn_blocking(move || pipeline::refresh_data_files(&convert_cfg));

    tokio::select! {
        _ = shutdown.changed() => {
            // The blocking task finishes on its own; its result is simply
            // never published.
            warn!("shutdown during conversion; cycle result discarded");
        }
        joined = conversion => match joined {
            Ok(Ok(days)) => {
                registry.rotate(&cfg.converted_path);
                info!(days, "cycle published");
            }
            Ok(Err(err)) => warn!(error = %err, "conversion failed; aliases unchanged"),
            Err(err) => warn!(error = %err, "conversion task aborted; aliases unchanged"),
        },
    }
}
