//! Periodic liveness polling that feeds the [`NetworkMonitor`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::monitor::NetworkMonitor;
use crate::sync::WorkerError;

/// Anything that can answer "is the backend reachable?".
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn is_healthy(&self) -> bool;
}

/// Background task polling a [`HealthProbe`] on a fixed interval.
pub struct ConnectivityProbe {
    probe: Arc<dyn HealthProbe>,
    monitor: NetworkMonitor,
    interval: Duration,
    join_timeout: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ConnectivityProbe {
    /// Probe that is not running yet; see [`Self::start`].
    pub fn new(probe: Arc<dyn HealthProbe>, monitor: NetworkMonitor, interval: Duration) -> Self {
        Self {
            probe,
            monitor,
            interval,
            join_timeout: Duration::from_secs(5),
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Spawn the polling task. A zero interval is rejected.
    #[instrument(skip(self), fields(interval_ms = self.interval.as_millis()))]
    pub fn start(&mut self) -> Result<(), WorkerError> {
        if self.is_running() {
            return Err(WorkerError::AlreadyRunning);
        }
        if self.interval.is_zero() {
            return Err(WorkerError::InvalidConfig("probe interval must be non-zero".into()));
        }

        self.cancellation = CancellationToken::new();
        let probe = Arc::clone(&self.probe);
        let monitor = self.monitor.clone();
        let interval = self.interval;
        let cancel = self.cancellation.clone();

        self.task_handle = Some(tokio::spawn(async move {
            Self::poll_loop(probe, monitor, interval, cancel).await;
        }));
        info!("Connectivity probe started");
        Ok(())
    }

    /// Cancel the polling task and wait for it to finish.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> Result<(), WorkerError> {
        let Some(handle) = self.task_handle.take() else {
            return Err(WorkerError::NotRunning);
        };

        self.cancellation.cancel();
        match tokio::time::timeout(self.join_timeout, handle).await {
            Ok(Ok(())) => {
                info!("Connectivity probe stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Connectivity probe task panicked");
                Err(WorkerError::Panicked(err.to_string()))
            }
            Err(_) => {
                warn!("Connectivity probe did not stop within timeout");
                Err(WorkerError::JoinTimeout(self.join_timeout))
            }
        }
    }

    pub const fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn poll_loop(
        probe: Arc<dyn HealthProbe>,
        monitor: NetworkMonitor,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("Connectivity probe loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let healthy = probe.is_healthy().await;
                    debug!(healthy, "Connectivity probe tick");
                    monitor.set_online(healthy);
                }
            }
        }
    }
}

impl Drop for ConnectivityProbe {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("ConnectivityProbe dropped while running; cancelling task");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use signage_domain::NetworkStatus;

    use super::*;

    struct FlagProbe(AtomicBool);

    #[async_trait]
    impl HealthProbe for FlagProbe {
        async fn is_healthy(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn probe_drives_monitor() {
        let flag = Arc::new(FlagProbe(AtomicBool::new(false)));
        let monitor = NetworkMonitor::new(NetworkStatus::Online);
        let mut rx = monitor.subscribe();
        let mut probe = ConnectivityProbe::new(
            Arc::clone(&flag) as Arc<dyn HealthProbe>,
            monitor.clone(),
            Duration::from_millis(10),
        );

        probe.start().unwrap();
        tokio::time::timeout(Duration::from_secs(2), rx.changed()).await.unwrap().unwrap();
        assert!(!monitor.is_online());

        flag.0.store(true, Ordering::SeqCst);
        tokio::time::timeout(Duration::from_secs(2), rx.changed()).await.unwrap().unwrap();
        assert!(monitor.is_online());

        probe.stop().await.unwrap();
        assert!(matches!(probe.stop().await, Err(WorkerError::NotRunning)));
    }

    #[tokio::test]
    async fn zero_interval_is_rejected_without_spawning() {
        let flag = Arc::new(FlagProbe(AtomicBool::new(true)));
        let mut probe = ConnectivityProbe::new(
            flag as Arc<dyn HealthProbe>,
            NetworkMonitor::default(),
            Duration::ZERO,
        );

        assert!(matches!(probe.start(), Err(WorkerError::InvalidConfig(_))));
        assert!(!probe.is_running());
        assert_eq!(probe.stop().await, Err(WorkerError::NotRunning));
    }
}
