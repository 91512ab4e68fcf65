use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use signage_core::{EventSink, OfflineQueueStore, RequestReplayer};
use signage_domain::{
    ApiError, ApiResult, ClientEvent, HttpMethod, OfflineQueueItem, Priority, QueueStats,
    StoreError, StoreResult, StoredRequest,
};

/// Vec-backed `OfflineQueueStore`.
#[derive(Default, Clone)]
pub struct MemoryQueueStore {
    items: Arc<Mutex<Vec<OfflineQueueItem>>>,
}

impl MemoryQueueStore {
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn retry_count(&self, id: &str) -> Option<u32> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .find(|item| item.id() == id)
            .map(|item| item.request.retry_count)
    }
}

#[async_trait]
impl OfflineQueueStore for MemoryQueueStore {
    async fn insert(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        let mut items = self.items.lock().unwrap();
        items.retain(|existing| existing.id() != item.id());
        items.push(item.clone());
        Ok(())
    }

    async fn list(&self, priority: Option<Priority>) -> StoreResult<Vec<OfflineQueueItem>> {
        // Insertion order on purpose; the service owns replay ordering.
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| priority.map_or(true, |p| item.priority == p))
            .cloned()
            .collect())
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.id() != id);
        Ok(items.len() != before)
    }

    async fn increment_retry(&self, id: &str) -> StoreResult<Option<u32>> {
        let mut items = self.items.lock().unwrap();
        Ok(items.iter_mut().find(|item| item.id() == id).map(|item| {
            item.request.retry_count += 1;
            item.request.retry_count
        }))
    }

    async fn stats(&self) -> StoreResult<QueueStats> {
        let items = self.items.lock().unwrap();
        let mut stats = QueueStats { total: items.len(), ..QueueStats::default() };
        for item in items.iter() {
            *stats.by_priority.entry(item.priority.to_string()).or_default() += 1;
        }
        stats.oldest_timestamp = items.iter().map(|item| item.request.timestamp).min();
        Ok(stats)
    }
}

/// Store whose disk is gone: every call fails.
#[derive(Default, Clone)]
pub struct BrokenQueueStore;

#[async_trait]
impl OfflineQueueStore for BrokenQueueStore {
    async fn insert(&self, _item: &OfflineQueueItem) -> StoreResult<()> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn list(&self, _priority: Option<Priority>) -> StoreResult<Vec<OfflineQueueItem>> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn remove(&self, _id: &str) -> StoreResult<bool> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn increment_retry(&self, _id: &str) -> StoreResult<Option<u32>> {
        Err(StoreError::Database("disk I/O error".into()))
    }

    async fn stats(&self) -> StoreResult<QueueStats> {
        Err(StoreError::Database("disk I/O error".into()))
    }
}

/// Replayer that records the order it was called in and fails chosen ids.
#[derive(Default, Clone)]
pub struct ScriptedReplayer {
    calls: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl ScriptedReplayer {
    pub fn failing(ids: &[&str]) -> Self {
        let replayer = Self::default();
        replayer.failing.lock().unwrap().extend(ids.iter().map(ToString::to_string));
        replayer
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RequestReplayer for ScriptedReplayer {
    async fn replay(&self, request: &StoredRequest) -> ApiResult<()> {
        self.calls.lock().unwrap().push(request.id.clone());
        if self.failing.lock().unwrap().contains(&request.id) {
            return Err(ApiError::server("replay rejected").with_status(503));
        }
        Ok(())
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default, Clone)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<ClientEvent>>>,
}

impl RecordingEvents {
    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEvents {
    fn publish(&self, event: ClientEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Request with a fixed id and timestamp.
pub fn request(id: &str, timestamp: i64, max_retries: u32) -> StoredRequest {
    let mut request = StoredRequest::new(HttpMethod::Post, format!("/content/{id}"), max_retries)
        .with_timestamp(timestamp);
    request.id = id.to_string();
    request
}
