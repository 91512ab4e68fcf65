use std::time::Duration;

use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use signage_domain::constants::{
    DEFAULT_BASE_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_TIMEOUT_SECS,
};
use signage_domain::{ApiConfig, ApiError, ApiResult};
use tracing::{debug, warn};

use crate::errors::IntoApiError;

/// HTTP client with built-in retry and timeout support.
///
/// Connection failures, timeouts and 5xx responses are retried up to
/// `max_attempts` total tries. The delay before retry `n` (0-based) is
/// `base_backoff * 2^n`, capped at `max_backoff`.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client configured from the `[api]` section.
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::builder()
            .timeout(config.timeout())
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff())
            .max_backoff(config.max_backoff())
            .build()
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a request with retry semantics.
    ///
    /// `make_request` is invoked once per attempt so bodies that cannot be
    /// cloned (streams, multipart forms) are rebuilt every time. A 5xx on
    /// the final attempt is returned as a response, not an error, so the
    /// caller can read its body.
    pub async fn send<F>(&self, make_request: F) -> ApiResult<Response>
    where
        F: Fn(&ReqwestClient) -> ApiResult<RequestBuilder>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0_u32;

        loop {
            let request = make_request(&self.client)?
                .build()
                .map_err(|err| err.into_api_error(self.timeout))?;
            let is_last = attempt + 1 >= attempts;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match self.client.execute(request).await {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && !is_last {
                        warn!(attempt = attempt + 1, %status, %url, "server error; retrying");
                        self.sleep_with_backoff(attempt).await;
                        attempt += 1;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    let err = err.into_api_error(self.timeout);
                    if !is_last && err.is_retryable() {
                        self.sleep_with_backoff(attempt).await;
                        attempt += 1;
                        continue;
                    }

                    return Err(err);
                }
            }
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let multiplier = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(multiplier).min(self.max_backoff)
    }

    async fn sleep_with_backoff(&self, attempt: u32) {
        let delay = self.backoff_delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    max_backoff: Duration,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(DEFAULT_BASE_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[must_use]
    pub const fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    #[must_use]
    pub const fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn build(self) -> ApiResult<HttpClient> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(concat!("signage-client/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|err| ApiError::network(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
            max_backoff: self.max_backoff,
        })
    }
}
