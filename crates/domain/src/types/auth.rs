//! Credential types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Access/refresh token pair held in the credential store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// True when the access token expires within `threshold`.
    ///
    /// Pairs without an expiry never report as expiring.
    pub fn expires_within(&self, threshold: Duration) -> bool {
        self.expires_at.is_some_and(|at| at - Utc::now() <= threshold)
    }
}

// Tokens never reach logs.
impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Payload of a successful refresh call.
///
/// Backends that do not rotate refresh tokens omit `refresh_token`.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    #[serde(alias = "accessToken", alias = "token")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default, alias = "expiresIn")]
    pub expires_in: Option<i64>,
}

impl RefreshResponse {
    /// Build the replacement pair, keeping the old refresh token if none was
    /// issued.
    pub fn into_pair(self, previous_refresh: &str) -> TokenPair {
        let pair = TokenPair::new(
            self.access_token,
            self.refresh_token.unwrap_or_else(|| previous_refresh.to_string()),
        );
        match self.expires_in {
            Some(secs) => pair.with_expiry(Utc::now() + Duration::seconds(secs)),
            None => pair,
        }
    }
}
