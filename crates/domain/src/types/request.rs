//! Outbound request types

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::queue::Priority;
use crate::errors::{ApiError, ApiResult};
use crate::impl_domain_status_conversions;

/// HTTP verbs accepted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl_domain_status_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
});

impl HttpMethod {
    /// Parse a caller-supplied verb; anything unsupported is a `validation` error.
    pub fn parse_verb(verb: &str) -> ApiResult<Self> {
        verb.trim().parse().map_err(ApiError::validation)
    }
}

/// A request persisted for later replay.
///
/// `url` is relative to the configured base URL. Headers hold whatever the
/// caller supplied plus the tenant and trace headers captured at enqueue
/// time; the bearer token is attached fresh at replay time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRequest {
    pub id: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl StoredRequest {
    /// Create a request with a fresh time-ordered id and the current time.
    pub fn new(method: HttpMethod, url: impl Into<String>, max_retries: u32) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            method,
            url: url.into(),
            body: None,
            headers: BTreeMap::new(),
            timestamp: Utc::now().timestamp_millis(),
            retry_count: 0,
            max_retries,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Per-call knobs for [`HttpMethod`] dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Tier used if the request is diverted to the offline queue
    pub priority: Priority,
    /// Fail fast instead of queueing when offline
    pub skip_offline_queue: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self { priority: Priority::Medium, skip_offline_queue: false }
    }
}
