//! Outbound request as seen by interceptors

use std::collections::BTreeMap;

use reqwest::Method;
use signage_domain::constants::{HEADER_AUTHORIZATION, HEADER_REQUEST_ID};
use signage_domain::{HttpMethod, StoredRequest};

/// A request after URL resolution and before it hits the wire.
///
/// Header names are compared case-insensitively by the accessors below;
/// interceptors should go through them rather than the map directly.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    /// Path relative to the API base, as given by the caller
    pub path: String,
    /// Absolute URL
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl OutboundRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Rebuild a request from the offline queue.
    pub fn from_stored(stored: &StoredRequest, url: impl Into<String>) -> Self {
        Self {
            method: stored.method,
            path: stored.url.clone(),
            url: url.into(),
            headers: stored.headers.clone(),
            body: stored.body.clone(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Option<serde_json::Value>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing value regardless of case.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.remove_header(name);
        self.headers.insert(name.to_string(), value.into());
    }

    /// Set a header only when the caller has not supplied one.
    pub fn set_header_if_absent(&mut self, name: &str, value: impl FnOnce() -> String) {
        if self.header(name).is_none() {
            self.headers.insert(name.to_string(), value());
        }
    }

    pub fn remove_header(&mut self, name: &str) {
        self.headers.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }

    /// Access token carried in the `Authorization` header, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(HEADER_AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer "))
    }

    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(HEADER_AUTHORIZATION, format!("Bearer {token}"));
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(HEADER_REQUEST_ID)
    }

    /// Snapshot for the offline queue.
    ///
    /// The bearer token is dropped; replay attaches whatever token is
    /// current at that time.
    pub fn to_stored(&self, max_retries: u32) -> StoredRequest {
        let mut headers = self.headers.clone();
        headers.retain(|key, _| !key.eq_ignore_ascii_case(HEADER_AUTHORIZATION));
        StoredRequest::new(self.method, self.path.clone(), max_retries)
            .with_body(self.body.clone())
            .with_headers(headers)
    }
}

pub(crate) const fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}
