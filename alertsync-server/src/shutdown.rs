//! Signal handling for graceful shutdown and config reload.

use crate::config::ConfigLoader;
use crate::config::runtime::AdminConfig;
use alertsync_core::config::{ConfigStore, RuntimeSyncSettings};
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::{RwLock, watch};

/// Completes when SIGTERM or SIGINT (Ctrl+C) is received.
pub async fn shutdown_signal() -> std::io::Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
        _ = sigint.recv() => {
            tracing::info!("Received SIGINT, initiating graceful shutdown");
        }
    }
    Ok(())
}

/// Spawns a task that flips `shutdown_tx` to `true` on SIGTERM or SIGINT.
pub fn spawn_shutdown_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            tracing::error!(error = %e, "Failed to install shutdown signal handlers");
            return;
        }
        shutdown_tx.send_replace(true);
    });
}

/// Spawns a task that listens for SIGHUP and reloads the configuration.
///
/// Only the admin secret and the runtime-sync flag are applied live; index,
/// sync and listener settings take effect on restart.
pub fn spawn_config_reload_handler(
    config_loader: Arc<ConfigLoader>,
    admin: Arc<RwLock<AdminConfig>>,
    runtime_sync: ConfigStore<RuntimeSyncSettings>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut sighup = match signal(SignalKind::hangup()) {
            Ok(sighup) => sighup,
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                _ = sighup.recv() => {
                    tracing::info!("Received SIGHUP, reloading configuration");
                    match config_loader.reload() {
                        Ok(loaded_config) => {
                            *admin.write().await = loaded_config.admin;
                            runtime_sync.update(loaded_config.runtime_sync);
                            tracing::info!(
                                runtime_sync_enabled = loaded_config.runtime_sync.enabled,
                                "Configuration reloaded successfully"
                            );
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload configuration");
                        }
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        tracing::debug!("Config reload handler shutting down");
                        break;
                    }
                }
            }
        }
    });
}
