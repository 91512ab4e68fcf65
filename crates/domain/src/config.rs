//! Client configuration structures
//!
//! Loaded from environment variables or JSON/TOML files by the infra config
//! loader. Every section except `api.base_url` has serde defaults so minimal
//! files stay minimal.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BASE_BACKOFF_MS, DEFAULT_HEALTH_PATH, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS,
    DEFAULT_QUEUE_DB_PATH, DEFAULT_QUEUE_MAX_RETRIES, DEFAULT_RATE_LIMIT_CRITICAL_BELOW,
    DEFAULT_RATE_LIMIT_WARN_BELOW, DEFAULT_REFRESH_PATH, DEFAULT_TIMEOUT_SECS,
};
use crate::types::Priority;

/// Invalid or missing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

/// Top-level client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

impl ClientConfig {
    /// Configuration with defaults everywhere except the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig::new(base_url),
            offline: OfflineConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Reject configurations the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api.base_url.trim();
        if base.is_empty() {
            return Err(ConfigError("api.base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError(format!("api.base_url must be an http(s) URL: {base}")));
        }
        if self.api.max_attempts == 0 {
            return Err(ConfigError("api.max_attempts must be greater than 0".into()));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConfigError("api.timeout_secs must be greater than 0".into()));
        }
        if self.offline.max_retries == 0 {
            return Err(ConfigError("offline.max_retries must be greater than 0".into()));
        }
        if self.rate_limit.critical_below > self.rate_limit.warn_below {
            return Err(ConfigError(
                "rate_limit.critical_below must not exceed rate_limit.warn_below".into(),
            ));
        }
        Ok(())
    }
}

/// Remote API settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Origin every relative request URL is joined onto
    pub base_url: String,
    /// Real-time channel origin; carried for the embedding app, unused here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realtime_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total transport attempts per request (initial try + retries)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            realtime_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff_ms: DEFAULT_BASE_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
        }
    }

    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub const fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Join a relative path onto the base URL.
    ///
    /// Absolute `http(s)` URLs pass through untouched.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

/// Offline queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_queue_db_path")]
    pub db_path: String,
    /// Replay failures tolerated before an item is abandoned
    #[serde(default = "default_queue_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub default_priority: Priority,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: DEFAULT_QUEUE_DB_PATH.to_string(),
            max_retries: DEFAULT_QUEUE_MAX_RETRIES,
            default_priority: Priority::Medium,
        }
    }
}

/// Rate-limit advisory thresholds (presentation policy only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_warn_below")]
    pub warn_below: u32,
    #[serde(default = "default_critical_below")]
    pub critical_below: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            warn_below: DEFAULT_RATE_LIMIT_WARN_BELOW,
            critical_below: DEFAULT_RATE_LIMIT_CRITICAL_BELOW,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_base_backoff_ms() -> u64 {
    DEFAULT_BASE_BACKOFF_MS
}

const fn default_max_backoff_ms() -> u64 {
    DEFAULT_MAX_BACKOFF_MS
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_queue_db_path() -> String {
    DEFAULT_QUEUE_DB_PATH.to_string()
}

const fn default_queue_max_retries() -> u32 {
    DEFAULT_QUEUE_MAX_RETRIES
}

const fn default_warn_below() -> u32 {
    DEFAULT_RATE_LIMIT_WARN_BELOW
}

const fn default_critical_below() -> u32 {
    DEFAULT_RATE_LIMIT_CRITICAL_BELOW
}
