//! Observable online/offline state

use std::sync::Arc;

use signage_core::{EventSink, NullEventSink};
use signage_domain::{ClientEvent, NetworkStatus};
use tokio::sync::watch;
use tracing::info;

/// Shared connectivity flag.
///
/// Cloning yields another handle to the same state. The embedding app (or a
/// [`ConnectivityProbe`](super::ConnectivityProbe)) reports changes with
/// [`set_online`](Self::set_online); interested tasks watch
/// [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct NetworkMonitor {
    state: Arc<watch::Sender<NetworkStatus>>,
    events: Arc<dyn EventSink>,
}

impl NetworkMonitor {
    /// Monitor starting in `initial`.
    pub fn new(initial: NetworkStatus) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state: Arc::new(state), events: Arc::new(NullEventSink) }
    }

    /// Publish `NetworkChanged` events to `events` on every transition.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn status(&self) -> NetworkStatus {
        *self.state.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.status().is_online()
    }

    /// Record the current connectivity. Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let status = NetworkStatus::from_online(online);
        let changed = self.state.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });

        if changed {
            info!(%status, "Network status changed");
            self.events.publish(ClientEvent::NetworkChanged { status });
        }
        changed
    }

    /// Receiver woken on every status change.
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.state.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(NetworkStatus::Online)
    }
}

impl std::fmt::Debug for NetworkMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkMonitor").field("status", &self.status()).finish_non_exhaustive()
    }
}
