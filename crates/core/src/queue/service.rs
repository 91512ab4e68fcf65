//! Offline queue service - enqueue, inspect and drain queued requests

use std::sync::Arc;

use signage_domain::{
    ApiError, ClientEvent, DrainReport, OfflineQueueItem, Priority, QueueStats, StoreResult,
    StoredRequest,
};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::ports::{OfflineQueueStore, RequestReplayer};
use crate::event_ports::{EventSink, NullEventSink};

/// Priority-ordered holding area for requests that could not be sent.
///
/// Drains run one at a time; a drain requested while another is in
/// progress returns a report with `skipped` set.
pub struct OfflineQueue {
    store: Arc<dyn OfflineQueueStore>,
    events: Arc<dyn EventSink>,
    drain_lock: Mutex<()>,
}

impl OfflineQueue {
    /// Create a queue over the given store
    pub fn new(store: Arc<dyn OfflineQueueStore>) -> Self {
        Self { store, events: Arc::new(NullEventSink), drain_lock: Mutex::new(()) }
    }

    /// Publish queue events to `events`
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Persist a request for later replay.
    ///
    /// Best effort: storage failures are logged and reported as `None`.
    pub async fn enqueue(&self, request: StoredRequest, priority: Priority) -> Option<String> {
        self.enqueue_item(OfflineQueueItem::new(request, priority)).await
    }

    /// Persist a fully built item (e.g. one carrying dependencies).
    #[instrument(skip(self, item), fields(id = %item.id(), priority = %item.priority))]
    pub async fn enqueue_item(&self, item: OfflineQueueItem) -> Option<String> {
        match self.store.insert(&item).await {
            Ok(()) => {
                debug!(method = %item.request.method, url = %item.request.url, "Request queued");
                self.events.publish(ClientEvent::RequestQueued {
                    id: item.request.id.clone(),
                    priority: item.priority,
                });
                Some(item.request.id)
            }
            Err(err) => {
                error!(error = %err, "Failed to persist offline request");
                None
            }
        }
    }

    /// Every queued item in replay order, optionally one tier only.
    pub async fn dequeue_all(
        &self,
        priority: Option<Priority>,
    ) -> StoreResult<Vec<OfflineQueueItem>> {
        let mut items = self.store.list(priority).await?;
        items.sort_by(OfflineQueueItem::replay_order);
        Ok(items)
    }

    /// Drop an item. Removing an unknown id is not an error.
    pub async fn remove(&self, id: &str) -> StoreResult<()> {
        let removed = self.store.remove(id).await?;
        if !removed {
            debug!(id, "Remove requested for unknown queue item");
        }
        Ok(())
    }

    /// Totals per tier and the oldest creation timestamp. Read-only.
    pub async fn stats(&self) -> StoreResult<QueueStats> {
        self.store.stats().await
    }

    /// Replay every queued request, highest priority and oldest first.
    ///
    /// Items are sent one by one through `replayer`. A success removes the
    /// item; a failure bumps its retry count and drops it once the budget is
    /// spent. One failure never stops the rest of the pass.
    #[instrument(skip_all)]
    pub async fn drain(&self, replayer: &dyn RequestReplayer) -> StoreResult<DrainReport> {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            debug!("Drain already in progress; skipping");
            return Ok(DrainReport { skipped: true, ..DrainReport::default() });
        };

        let items = self.dequeue_all(None).await?;
        let mut report = DrainReport::default();
        if items.is_empty() {
            return Ok(report);
        }

        info!(count = items.len(), "Draining offline queue");

        for item in items {
            report.attempted.push(item.request.id.clone());
            match replayer.replay(&item.request).await {
                Ok(()) => {
                    if let Err(err) = self.store.remove(item.id()).await {
                        error!(id = %item.id(), error = %err, "Replayed item could not be removed");
                    }
                    report.replayed += 1;
                }
                Err(err) => self.record_failure(&item, &err, &mut report).await,
            }
        }

        info!(
            replayed = report.replayed,
            retained = report.retained,
            abandoned = report.abandoned,
            "Offline queue drain finished"
        );
        self.events.publish(ClientEvent::QueueDrained {
            replayed: report.replayed,
            retained: report.retained,
            abandoned: report.abandoned,
        });

        Ok(report)
    }

    async fn record_failure(
        &self,
        item: &OfflineQueueItem,
        cause: &ApiError,
        report: &mut DrainReport,
    ) {
        let id = item.id();
        let retry_count = match self.store.increment_retry(id).await {
            Ok(Some(count)) => count,
            Ok(None) => return,
            Err(err) => {
                error!(id, error = %err, "Failed to record replay failure");
                report.retained += 1;
                return;
            }
        };

        if retry_count < item.request.max_retries {
            debug!(id, retry_count, error = %cause, "Replay failed; item retained");
            report.retained += 1;
            return;
        }

        warn!(
            id,
            retry_count,
            method = %item.request.method,
            url = %item.request.url,
            error = %cause,
            "Queued request permanently abandoned after exhausting retries"
        );
        if let Err(err) = self.store.remove(id).await {
            error!(id, error = %err, "Failed to remove abandoned item");
        }
        report.abandoned += 1;
        self.events.publish(ClientEvent::RequestAbandoned { id: id.to_string(), retry_count });
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue").finish_non_exhaustive()
    }
}
