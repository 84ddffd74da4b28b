//! Run the directory synchronizer

use crate::cli::app::WatchArgs;
use anyhow::{Context, Result};
use model_deployer_core::{DirectorySync, HttpCollection, ModelCollection, RecordingCollection, SyncControl};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn execute(args: WatchArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    args.apply(&mut config);
    config.validate().context("Invalid deployer configuration")?;

    let url = config.collection_url();
    let collection: Arc<dyn ModelCollection> = if args.dry_run {
        warn!("Dry run: deploys and undeploys are only logged");
        Arc::new(RecordingCollection::new(&url))
    } else {
        Arc::new(HttpCollection::new(&url, config.request_timeout())?)
    };

    info!("Model collection URL is {}", url);
    let sync = DirectorySync::from_config(&config, collection)?;

    let (control_tx, control_rx) = mpsc::channel(4);

    // Set up signal handler for graceful shutdown
    tokio::spawn(stop_on_interrupt(tokio::signal::ctrl_c(), control_tx.clone()));

    #[cfg(unix)]
    spawn_rescan_on_hangup(control_tx.clone())?;

    let tracked = sync.run(control_rx).await;
    info!("Models tracked at shutdown: {:?}", tracked.names());

    Ok(())
}

/// Send `Stop` once `interrupt` fires. A handler that could not be installed
/// leaves the loop running.
async fn stop_on_interrupt(interrupt: impl Future<Output = std::io::Result<()>>, tx: mpsc::Sender<SyncControl>) {
    if let Err(e) = interrupt.await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        return;
    }
    info!("Interrupted; stopping after the current cycle");
    tx.send(SyncControl::Stop).await.ok();
}

/// SIGHUP triggers an immediate scan. In notify mode that scan compares the
/// directory against the tracked models.
#[cfg(unix)]
fn spawn_rescan_on_hangup(tx: mpsc::Sender<SyncControl>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received; rescanning");
            if tx.send(SyncControl::Rescan).await.is_err() {
                break;
            }
        }
    });

    Ok(())
}
