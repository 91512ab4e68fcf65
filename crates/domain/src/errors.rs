//! Error types used throughout the client

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_domain_status_conversions;

/// Coarse classification of every failure surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Request rejected as malformed (400, 422 and unlisted 4xx)
    Validation,
    /// Missing or expired credentials (401)
    Unauthorized,
    /// Authenticated but not allowed (403)
    PermissionDenied,
    /// Resource does not exist (404)
    NotFound,
    /// Too many requests (429)
    RateLimited,
    /// Tenant quota exhausted (429 with an explicit quota signal)
    QuotaExceeded,
    /// Server-side failure (5xx, malformed success body)
    Server,
    /// No response received (connection refused, DNS, offline)
    Network,
    /// The request exceeded its deadline
    Timeout,
}

impl_domain_status_conversions!(ApiErrorKind {
    Validation => "validation",
    Unauthorized => "unauthorized",
    PermissionDenied => "permission_denied",
    NotFound => "not_found",
    RateLimited => "rate_limited",
    QuotaExceeded => "quota_exceeded",
    Server => "server",
    Network => "network",
    Timeout => "timeout",
});

impl ApiErrorKind {
    /// Classify an HTTP error status.
    ///
    /// `quota_exhausted` only matters for 429 responses.
    pub fn from_status(status: u16, quota_exhausted: bool) -> Self {
        match status {
            401 => Self::Unauthorized,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            429 if quota_exhausted => Self::QuotaExceeded,
            429 => Self::RateLimited,
            500..=599 => Self::Server,
            _ => Self::Validation,
        }
    }

    /// Whether the transport layer may retry this failure with backoff.
    ///
    /// Unauthorized is handled by the refresh protocol, not by retries.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::Server)
    }
}

/// Normalized client-facing failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind} error: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), status: None, details: None, trace_id: None }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Validation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unauthorized, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Server, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(ApiErrorKind::Timeout, format!("request timed out after {after:?}"))
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Failures of the local persistent stores (offline queue, credentials).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage task failed: {0}")]
    Task(String),

    #[error("Invalid stored value: {0}")]
    Invalid(String),
}

// Local storage failures reach callers as server-side errors; there is no
// client-visible kind for the device's own database.
impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        Self::server(format!("local storage failure: {value}"))
    }
}

/// Result type alias for client operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
