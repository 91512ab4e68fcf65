//! Port interfaces for the offline queue

use async_trait::async_trait;
use signage_domain::{ApiResult, OfflineQueueItem, Priority, QueueStats, StoreResult, StoredRequest};

/// Durable storage for queued requests.
///
/// Every mutation is a single atomic statement; no method holds state
/// across calls.
#[async_trait]
pub trait OfflineQueueStore: Send + Sync {
    /// Persist a new item. Replaces an existing item with the same id.
    async fn insert(&self, item: &OfflineQueueItem) -> StoreResult<()>;

    /// All items in replay order, optionally restricted to one tier.
    async fn list(&self, priority: Option<Priority>) -> StoreResult<Vec<OfflineQueueItem>>;

    /// Delete an item. Returns whether a row was removed.
    async fn remove(&self, id: &str) -> StoreResult<bool>;

    /// Bump the retry count and return the new value.
    ///
    /// Returns `None` when the item no longer exists.
    async fn increment_retry(&self, id: &str) -> StoreResult<Option<u32>>;

    /// Totals per tier and age of the oldest item.
    async fn stats(&self) -> StoreResult<QueueStats>;
}

/// Re-issues a stored request directly on the network.
///
/// Implementations must not consult connectivity state or divert back into
/// the queue.
#[async_trait]
pub trait RequestReplayer: Send + Sync {
    /// Send the request once; `Ok` means the server accepted it.
    async fn replay(&self, request: &StoredRequest) -> ApiResult<()>;
}
