//! The directory sync loop

use super::dispatcher::{CycleReport, Dispatcher};
use crate::collection::ModelCollection;
use crate::error::SyncError;
use crate::monitor::ChangeSource;
use crate::registry::TrackedSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Phase of the sync loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Booting,
    InitialScan,
    Idle,
    Scanning,
    Stopped,
}

/// Commands accepted while the loop runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncControl {
    /// Cut the current wait short and scan now
    Rescan,
    /// Finish the current cycle and stop
    Stop,
}

/// How a wait ended
enum Wake {
    Elapsed,
    Rescan,
    Stop,
}

/// Keeps a model collection in step with a directory.
///
/// One task runs everything: warm-up, initial scan, then wait/scan/dispatch
/// cycles. Cycles never overlap and remote calls are made one at a time.
pub struct DirectorySync {
    source: Box<dyn ChangeSource>,
    dispatcher: Dispatcher,
    warmup: Duration,
    state: watch::Sender<SyncState>,
    cycles: u64,
}

impl DirectorySync {
    pub fn new(source: Box<dyn ChangeSource>, collection: Arc<dyn ModelCollection>, warmup: Duration) -> Self {
        let (state, _) = watch::channel(SyncState::Booting);
        Self { source, dispatcher: Dispatcher::new(collection), warmup, state, cycles: 0 }
    }

    /// Observe state transitions
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Run until [`SyncControl::Stop`] arrives and return what is tracked at that point.
    ///
    /// Dropping every control sender leaves the loop running for good.
    pub async fn run(mut self, control: mpsc::Receiver<SyncControl>) -> TrackedSet {
        let mut control = Some(control);

        info!("Starting directory sync ({} source)", self.source.name());

        self.set_state(SyncState::Booting);
        info!("Delaying initial scan by {:?} to let the scoring server start", self.warmup);
        match wait(sleep(self.warmup), &mut control).await {
            Wake::Elapsed => {}
            Wake::Rescan => info!("{}; starting now", SyncError::InterruptedWait { phase: "warm-up" }),
            Wake::Stop => return self.stop("stop requested during warm-up"),
        }

        self.set_state(SyncState::InitialScan);
        info!("Performing initial scan of model directory");
        match self.source.initial_scan().await {
            Ok(changes) => {
                let report = self.dispatcher.dispatch_all(changes).await;
                log_report("initial scan", &report, self.dispatcher.tracked());
            }
            Err(e) => error!("Initial scan failed: {}", e),
        }

        loop {
            self.set_state(SyncState::Idle);
            match wait(self.source.wait_for_changes(), &mut control).await {
                Wake::Elapsed => {}
                Wake::Rescan => info!("{}; scanning now", SyncError::InterruptedWait { phase: "idle" }),
                Wake::Stop => break,
            }

            self.set_state(SyncState::Scanning);
            self.cycles += 1;
            self.run_cycle().await;
        }

        self.stop("stop requested")
    }

    async fn run_cycle(&mut self) {
        let cycle = self.cycles;
        let collected = self.source.collect_changes(self.dispatcher.tracked()).await;
        match collected {
            Ok(changes) if changes.is_empty() => debug!("Cycle {}: no changes", cycle),
            Ok(changes) => {
                debug!("Cycle {}: {} changes", cycle, changes.len());
                let report = self.dispatcher.dispatch_all(changes).await;
                log_report(&format!("cycle {}", cycle), &report, self.dispatcher.tracked());
            }
            Err(e) => error!("Cycle {} skipped: {}", cycle, e),
        }
    }

    fn set_state(&self, state: SyncState) {
        debug!("Sync state: {:?}", state);
        self.state.send_replace(state);
    }

    fn stop(self, reason: &str) -> TrackedSet {
        self.set_state(SyncState::Stopped);
        let tracked = self.dispatcher.into_tracked();
        info!("Directory sync stopped ({}) after {} cycles; {} models tracked", reason, self.cycles, tracked.len());
        tracked
    }
}

fn log_report(label: &str, report: &CycleReport, tracked: &TrackedSet) {
    if report.is_empty() {
        debug!("{}: nothing to do", label);
        return;
    }

    info!(
        "{}: {} deployed, {} undeployed, {} skipped, {} failed; tracking {} models",
        label,
        report.deployed,
        report.undeployed,
        report.skipped,
        report.failed,
        tracked.len()
    );
}

/// Wait for `fut`, unless a control command arrives first
async fn wait<F>(fut: F, control: &mut Option<mpsc::Receiver<SyncControl>>) -> Wake
where
    F: Future<Output = ()>,
{
    tokio::pin!(fut);

    loop {
        let command = tokio::select! {
            biased;
            command = next_control(control) => command,
            _ = &mut fut => return Wake::Elapsed,
        };

        match command {
            Some(SyncControl::Stop) => return Wake::Stop,
            Some(SyncControl::Rescan) => return Wake::Rescan,
            None => {
                debug!("Control channel closed; running until the process exits");
                *control = None;
            }
        }
    }
}

async fn next_control(control: &mut Option<mpsc::Receiver<SyncControl>>) -> Option<SyncControl> {
    match control {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
