//! Offline sync worker
//!
//! Watches the [`NetworkMonitor`] and drains the offline queue each time
//! connectivity comes back.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use signage_core::{OfflineQueue, RequestReplayer};
//! use signage_infra::network::NetworkMonitor;
//! use signage_infra::sync::{OfflineSyncWorker, OfflineSyncWorkerConfig};
//!
//! # async fn example(
//! #     queue: Arc<OfflineQueue>,
//! #     replayer: Arc<dyn RequestReplayer>,
//! # ) -> Result<(), signage_infra::sync::WorkerError> {
//! let monitor = NetworkMonitor::default();
//! let mut worker =
//!     OfflineSyncWorker::new(queue, replayer, monitor.clone(), OfflineSyncWorkerConfig::default());
//!
//! worker.start()?;
//! monitor.set_online(false);
//! monitor.set_online(true); // triggers a drain
//! worker.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use signage_core::{OfflineQueue, RequestReplayer};
use signage_domain::NetworkStatus;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::errors::WorkerError;
use crate::network::NetworkMonitor;

/// Configuration for the offline sync worker.
#[derive(Debug, Clone)]
pub struct OfflineSyncWorkerConfig {
    /// Upper bound for a single drain pass
    pub drain_timeout: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for OfflineSyncWorkerConfig {
    fn default() -> Self {
        Self {
            drain_timeout: Duration::from_secs(300),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Drains the offline queue on every offline→online transition.
///
/// Starting the worker never drains by itself, even when already online.
pub struct OfflineSyncWorker {
    queue: Arc<OfflineQueue>,
    replayer: Arc<dyn RequestReplayer>,
    monitor: NetworkMonitor,
    config: OfflineSyncWorkerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl OfflineSyncWorker {
    /// Worker that is not running yet; see [`Self::start`].
    pub fn new(
        queue: Arc<OfflineQueue>,
        replayer: Arc<dyn RequestReplayer>,
        monitor: NetworkMonitor,
        config: OfflineSyncWorkerConfig,
    ) -> Self {
        Self {
            queue,
            replayer,
            monitor,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Start the worker, spawning the background watch task.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }

        info!("Starting offline sync worker");

        self.cancellation = CancellationToken::new();

        let queue = Arc::clone(&self.queue);
        let replayer = Arc::clone(&self.replayer);
        let status_rx = self.monitor.subscribe();
        let config = self.config.clone();
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::watch_loop(queue, replayer, status_rx, config, cancel).await;
        });

        self.task_handle = Some(handle);
        Ok(())
    }

    /// Stop the worker and wait for the watch task to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        info!("Stopping offline sync worker");
        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Worker task panicked: {}", e);
                return Err(WorkerError::Panicked(e.to_string()));
            }
            Err(_) => {
                warn!("Worker task did not complete within timeout");
                return Err(WorkerError::JoinTimeout(join_timeout));
            }
        }

        info!("Offline sync worker stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a worker instance is active.
    pub const fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn watch_loop(
        queue: Arc<OfflineQueue>,
        replayer: Arc<dyn RequestReplayer>,
        mut status_rx: watch::Receiver<NetworkStatus>,
        config: OfflineSyncWorkerConfig,
        cancel: CancellationToken,
    ) {
        // The receiver starts with the current status already seen, so only
        // flips after `start` wake the loop.
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Offline sync watch loop cancelled");
                    break;
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        debug!("Network monitor dropped; stopping watch loop");
                        break;
                    }
                    // Only changes are signalled, so seeing "online" here means
                    // we were offline at some point since the last wake-up.
                    let status = *status_rx.borrow_and_update();
                    if status.is_online() {
                        info!("Connectivity restored; draining offline queue");
                        Self::drain_once(&queue, &replayer, config.drain_timeout, &cancel).await;
                    }
                }
            }
        }
    }

    async fn drain_once(
        queue: &OfflineQueue,
        replayer: &Arc<dyn RequestReplayer>,
        drain_timeout: Duration,
        cancel: &CancellationToken,
    ) {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!("Drain interrupted by shutdown");
            }
            outcome = tokio::time::timeout(drain_timeout, queue.drain(replayer.as_ref())) => {
                match outcome {
                    Ok(Ok(report)) if report.skipped => debug!("Drain already in progress"),
                    Ok(Ok(report)) => debug!(
                        replayed = report.replayed,
                        retained = report.retained,
                        abandoned = report.abandoned,
                        "Automatic drain finished"
                    ),
                    Ok(Err(err)) => error!(error = %err, "Automatic drain failed"),
                    Err(_) => warn!(
                        timeout_secs = drain_timeout.as_secs(),
                        "Automatic drain timed out"
                    ),
                }
            }
        }
    }
}

impl Drop for OfflineSyncWorker {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("OfflineSyncWorker dropped while running; cancelling tasks");
            self.cancellation.cancel();
        }
    }
}
