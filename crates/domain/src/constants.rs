//! Client constants
//!
//! Header names and default tuning values shared by every crate in the
//! workspace.

// Request headers produced by the client
pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_TENANT_ID: &str = "X-Tenant-ID";
pub const HEADER_REQUEST_ID: &str = "X-Request-ID";

// Response headers consumed by the client
pub const HEADER_RATE_LIMIT_REMAINING: &str = "X-RateLimit-Remaining";
pub const HEADER_QUOTA_EXCEEDED: &str = "X-Quota-Exceeded";

/// Error `code` the backend uses on a 429 when the tenant quota is exhausted.
pub const QUOTA_EXCEEDED_CODE: &str = "QUOTA_EXCEEDED";

// Transport defaults
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_BACKOFF_MS: u64 = 1_000;
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 30_000;
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

// Offline queue defaults
pub const DEFAULT_QUEUE_MAX_RETRIES: u32 = 3;
pub const DEFAULT_QUEUE_DB_PATH: &str = "signage-offline.db";

// Rate-limit advisory thresholds
pub const DEFAULT_RATE_LIMIT_WARN_BELOW: u32 = 10;
pub const DEFAULT_RATE_LIMIT_CRITICAL_BELOW: u32 = 5;

/// Capacity of the client event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
