//! Events published by the client for the embedding application

use serde::{Deserialize, Serialize};

use super::queue::Priority;
use crate::impl_domain_status_conversions;

/// Connectivity as seen by the network monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl_domain_status_conversions!(NetworkStatus {
    Online => "online",
    Offline => "offline",
});

impl NetworkStatus {
    pub const fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }
}

/// How close the tenant is to its rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitSeverity {
    Warning,
    Critical,
}

/// Observable client-side state changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Refresh failed; credentials were purged and the user must sign in again
    SessionExpired { message: String },
    /// Remaining request quota dropped below a configured threshold
    RateLimitLow { remaining: u32, severity: RateLimitSeverity },
    /// A request was diverted to the offline queue
    RequestQueued { id: String, priority: Priority },
    /// A queued request exhausted its retries and was dropped
    RequestAbandoned { id: String, retry_count: u32 },
    /// A drain pass finished
    QueueDrained { replayed: usize, retained: usize, abandoned: usize },
    /// The network monitor changed state
    NetworkChanged { status: NetworkStatus },
}
