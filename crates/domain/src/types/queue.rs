//! Offline queue types

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::request::StoredRequest;
use crate::impl_domain_status_conversions;

/// Replay tier for queued requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl_domain_status_conversions!(Priority {
    High => "high",
    Medium => "medium",
    Low => "low",
});

impl Priority {
    /// Every tier, highest first.
    pub const ALL: [Self; 3] = [Self::High, Self::Medium, Self::Low];

    /// Numeric rank used for storage and sorting (higher replays first).
    pub const fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// A stored request tagged with its replay tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfflineQueueItem {
    #[serde(flatten)]
    pub request: StoredRequest,
    pub priority: Priority,
    /// Reserved; declared by producers but never used for ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

impl OfflineQueueItem {
    pub fn new(request: StoredRequest, priority: Priority) -> Self {
        Self { request, priority, dependencies: None }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    pub fn id(&self) -> &str {
        &self.request.id
    }

    /// Replay order: priority descending, then oldest first, then id.
    pub fn replay_order(&self, other: &Self) -> Ordering {
        other
            .priority
            .rank()
            .cmp(&self.priority.rank())
            .then_with(|| self.request.timestamp.cmp(&other.request.timestamp))
            .then_with(|| self.request.id.cmp(&other.request.id))
    }
}

/// Read-only queue introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_priority: BTreeMap<String, usize>,
    /// Creation time of the oldest item (ms since epoch), if any
    pub oldest_timestamp: Option<i64>,
}

impl QueueStats {
    pub fn count(&self, priority: Priority) -> usize {
        self.by_priority.get(priority.as_str()).copied().unwrap_or(0)
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Ids in the order they were replayed
    pub attempted: Vec<String>,
    pub replayed: usize,
    pub retained: usize,
    pub abandoned: usize,
    /// Another drain was already running
    pub skipped: bool,
}
