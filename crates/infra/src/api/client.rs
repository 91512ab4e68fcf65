//! Signage API client
//!
//! Every outbound call goes through the same pipeline: interceptors attach
//! auth, tenant and trace headers; offline requests are diverted to the
//! queue; online requests go through the retrying transport; a 401 triggers
//! one refresh-and-resend; every response is checked for rate-limit
//! pressure before it is decoded.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use signage_core::{
    classify_remaining, CredentialStore, EventSink, NullEventSink, OfflineQueue, RequestReplayer,
};
use signage_domain::constants::HEALTH_CHECK_TIMEOUT_SECS;
use signage_domain::{
    ApiError, ApiErrorKind, ApiResult, ClientConfig, ClientEvent, ConfigError, DrainReport,
    HttpMethod, OfflineQueueItem, RequestOptions, StoredRequest, TokenPair, UploadFile,
    UploadProgress,
};
use tracing::{debug, info, instrument, warn};

use super::auth::TokenRefresher;
use super::interceptors::{default_pipeline, RequestInterceptor};
use super::request::{to_reqwest_method, OutboundRequest};
use super::response;
use crate::credentials::MemoryCredentialStore;
use crate::http::HttpClient;
use crate::network::{HealthProbe, NetworkMonitor};

/// Callback invoked as upload bytes are handed to the transport.
pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Size of the chunks an upload body is streamed in.
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Multipart field that carries the file.
const UPLOAD_FILE_FIELD: &str = "file";

/// What goes into the request body on each attempt.
enum Payload<'a> {
    Json,
    Multipart {
        file: &'a UploadFile,
        fields: &'a BTreeMap<String, String>,
        progress: Option<&'a ProgressCallback>,
    },
}

/// API client for the signage backend.
///
/// Share it behind an `Arc`; it also serves as the replayer for the
/// offline queue and as the health probe for connectivity polling.
pub struct ApiClient {
    config: ClientConfig,
    http: HttpClient,
    credentials: Arc<dyn CredentialStore>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    refresher: TokenRefresher,
    network: NetworkMonitor,
    queue: Option<Arc<OfflineQueue>>,
    events: Arc<dyn EventSink>,
}

impl ApiClient {
    /// Start building a client for `config`.
    pub fn builder(config: ClientConfig) -> ApiClientBuilder {
        ApiClientBuilder::new(config)
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn network(&self) -> &NetworkMonitor {
        &self.network
    }

    pub fn offline_queue(&self) -> Option<&Arc<OfflineQueue>> {
        self.queue.as_ref()
    }

    /// Number of token refresh calls made so far.
    pub fn refresh_count(&self) -> usize {
        self.refresher.refresh_count()
    }

    /// Send a request; offline, it is queued at the configured default
    /// priority.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        headers: Option<BTreeMap<String, String>>,
    ) -> ApiResult<T> {
        let options = RequestOptions {
            priority: self.config.offline.default_priority,
            ..RequestOptions::default()
        };
        self.send_with(method, path, body, headers, options).await
    }

    /// Send a request, choosing the offline priority or opting out of
    /// offline queueing.
    ///
    /// While offline the request is queued (unless disabled) and the call
    /// fails with a `network` error either way; nothing reaches the wire.
    #[instrument(skip_all, fields(%method, path = %path))]
    pub async fn send_with<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        headers: Option<BTreeMap<String, String>>,
        options: RequestOptions,
    ) -> ApiResult<T> {
        let request = OutboundRequest::new(method, path, self.config.api.url_for(path))
            .with_body(body)
            .with_headers(headers.unwrap_or_default());

        if !self.network.is_online() {
            return Err(self.divert_offline(request, options).await);
        }

        self.execute(request, &Payload::Json).await
    }

    /// `GET path`, decoded into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(HttpMethod::Get, path, None, None).await
    }

    /// `POST path` with a JSON body.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(HttpMethod::Post, path, Some(to_json(body)?), None).await
    }

    /// `PUT path` with a JSON body.
    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(HttpMethod::Put, path, Some(to_json(body)?), None).await
    }

    /// `PATCH path` with a JSON body.
    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(HttpMethod::Patch, path, Some(to_json(body)?), None).await
    }

    /// `DELETE path`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(HttpMethod::Delete, path, None, None).await
    }

    /// Upload a file as `multipart/form-data`.
    ///
    /// The file goes in the `file` part, `extra_fields` as text parts.
    /// Uploads are never queued: while offline this fails immediately.
    #[instrument(skip_all, fields(path = %path, file = %file.file_name))]
    pub async fn upload_file<T: DeserializeOwned>(
        &self,
        path: &str,
        file: UploadFile,
        on_progress: Option<ProgressCallback>,
        extra_fields: Option<BTreeMap<String, String>>,
    ) -> ApiResult<T> {
        // Surface a bad content type before touching the network.
        Part::bytes(Vec::new()).mime_str(&file.content_type).map_err(|err| {
            ApiError::validation(format!("invalid content type {:?}: {err}", file.content_type))
        })?;

        if !self.network.is_online() {
            return Err(ApiError::network("offline: uploads are not queued"));
        }

        let fields = extra_fields.unwrap_or_default();
        let request = OutboundRequest::new(HttpMethod::Post, path, self.config.api.url_for(path));
        let payload = Payload::Multipart { file: &file, fields: &fields, progress: on_progress.as_ref() };
        self.execute(request, &payload).await
    }

    /// Whether the liveness endpoint answers with success.
    pub async fn health_check(&self) -> bool {
        let url = self.config.api.url_for(&self.config.api.health_path);
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        let outcome = tokio::time::timeout(
            timeout,
            self.http.send(|client| Ok(client.get(&url).timeout(timeout))),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => response.status().is_success(),
            Ok(Err(err)) => {
                debug!(error = %err, "Health check failed");
                false
            }
            Err(_) => {
                debug!(timeout_secs = HEALTH_CHECK_TIMEOUT_SECS, "Health check timed out");
                false
            }
        }
    }

    /// Store a fresh token pair, typically after sign-in.
    pub async fn set_tokens(&self, tokens: &TokenPair) -> ApiResult<()> {
        self.credentials.save_tokens(tokens).await?;
        Ok(())
    }

    /// Forget the stored tokens and the active tenant.
    pub async fn clear_session(&self) -> ApiResult<()> {
        self.credentials.clear_tokens().await?;
        self.credentials.set_tenant(None).await?;
        info!("Session cleared");
        Ok(())
    }

    /// Select the tenant sent as `X-Tenant-ID`; `None` stops sending it.
    pub async fn set_tenant(&self, tenant: Option<&str>) -> ApiResult<()> {
        self.credentials.set_tenant(tenant).await?;
        Ok(())
    }

    /// The active tenant, if any.
    pub async fn tenant(&self) -> ApiResult<Option<String>> {
        Ok(self.credentials.tenant().await?)
    }

    /// Replay everything in the offline queue now.
    pub async fn drain_offline_queue(&self) -> ApiResult<DrainReport> {
        let Some(queue) = &self.queue else {
            return Ok(DrainReport::default());
        };
        Ok(queue.drain(self).await?)
    }

    async fn divert_offline(&self, mut request: OutboundRequest, options: RequestOptions) -> ApiError {
        let offline = ApiError::network("offline: request not sent");

        let queue = match &self.queue {
            Some(queue) if self.config.offline.enabled && !options.skip_offline_queue => queue,
            _ => return offline,
        };

        // Capture tenant and trace headers now; the bearer is dropped.
        if let Err(err) = self.apply_interceptors(&mut request).await {
            warn!(error = %err, "Failed to prepare offline request");
            return offline;
        }
        let trace_id = request.request_id().map(str::to_owned);
        let item = OfflineQueueItem::new(
            request.to_stored(self.config.offline.max_retries),
            options.priority,
        );

        let error = match queue.enqueue_item(item).await {
            Some(id) => ApiError::network(format!("offline: request queued for replay ({id})")),
            None => offline,
        };
        match trace_id {
            Some(trace_id) => error.with_trace_id(trace_id),
            None => error,
        }
    }

    async fn apply_interceptors(&self, request: &mut OutboundRequest) -> ApiResult<()> {
        for interceptor in &self.interceptors {
            interceptor.intercept(request).await?;
        }
        Ok(())
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        mut request: OutboundRequest,
        payload: &Payload<'_>,
    ) -> ApiResult<T> {
        self.apply_interceptors(&mut request).await?;

        match self.execute_once(&request, payload).await {
            Err(err) if err.kind == ApiErrorKind::Unauthorized => {
                let stale = request.bearer_token().map(str::to_owned);
                match self.refresher.refresh(stale.as_deref()).await {
                    Ok(tokens) => {
                        debug!("Resending request with refreshed token");
                        request.set_bearer(&tokens.access_token);
                        self.execute_once(&request, payload).await
                    }
                    Err(refresh_err) => {
                        debug!(error = %refresh_err, "Refresh unavailable; returning original error");
                        Err(err)
                    }
                }
            }
            outcome => outcome,
        }
    }

    async fn execute_once<T: DeserializeOwned>(
        &self,
        request: &OutboundRequest,
        payload: &Payload<'_>,
    ) -> ApiResult<T> {
        let method = to_reqwest_method(request.method);

        let response = self
            .http
            .send(|client| {
                let mut builder = client.request(method.clone(), &request.url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                attach_payload(builder, request, payload)
            })
            .await?;

        self.observe_rate_limit(response.headers());
        response::decode(response).await
    }

    fn observe_rate_limit(&self, headers: &reqwest::header::HeaderMap) {
        let Some(remaining) = response::rate_limit_remaining(headers) else {
            return;
        };
        if let Some(severity) = classify_remaining(remaining, &self.config.rate_limit) {
            warn!(remaining, ?severity, "API rate limit running low");
            self.events.publish(ClientEvent::RateLimitLow { remaining, severity });
        }
    }
}

#[async_trait]
impl RequestReplayer for ApiClient {
    async fn replay(&self, request: &StoredRequest) -> ApiResult<()> {
        let outbound = OutboundRequest::from_stored(request, self.config.api.url_for(&request.url));
        let _: Value = self.execute(outbound, &Payload::Json).await?;
        Ok(())
    }
}

#[async_trait]
impl HealthProbe for ApiClient {
    async fn is_healthy(&self) -> bool {
        self.health_check().await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.api.base_url)
            .field("network", &self.network)
            .field("offline_queue", &self.queue.is_some())
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body)
        .map_err(|err| ApiError::validation(format!("request body is not serializable: {err}")))
}

fn attach_payload(
    builder: RequestBuilder,
    request: &OutboundRequest,
    payload: &Payload<'_>,
) -> ApiResult<RequestBuilder> {
    match payload {
        Payload::Json => Ok(match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        }),
        Payload::Multipart { file, fields, progress } => {
            Ok(builder.multipart(multipart_form(file, fields, *progress)?))
        }
    }
}

/// Build a fresh form for one attempt; progress restarts from zero.
fn multipart_form(
    file: &UploadFile,
    fields: &BTreeMap<String, String>,
    progress: Option<&ProgressCallback>,
) -> ApiResult<Form> {
    let total = file.len();
    let chunks: Vec<Vec<u8>> = file.bytes.chunks(UPLOAD_CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let progress = progress.cloned();
    let mut loaded = 0_u64;

    let stream = futures::stream::iter(chunks).map(move |chunk| {
        loaded += chunk.len() as u64;
        if let Some(callback) = &progress {
            callback(UploadProgress::new(loaded, total));
        }
        Ok::<_, std::io::Error>(chunk)
    });

    let part = Part::stream_with_length(Body::wrap_stream(stream), total)
        .file_name(file.file_name.clone())
        .mime_str(&file.content_type)
        .map_err(|err| {
            ApiError::validation(format!("invalid content type {:?}: {err}", file.content_type))
        })?;

    let form = fields
        .iter()
        .fold(Form::new(), |form, (name, value)| form.text(name.clone(), value.clone()));
    Ok(form.part(UPLOAD_FILE_FIELD, part))
}

/// Builder for [`ApiClient`].
pub struct ApiClientBuilder {
    config: ClientConfig,
    credentials: Option<Arc<dyn CredentialStore>>,
    network: Option<NetworkMonitor>,
    queue: Option<Arc<OfflineQueue>>,
    events: Option<Arc<dyn EventSink>>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    http: Option<HttpClient>,
}

impl ApiClientBuilder {
    /// Builder with an in-memory credential store and no offline queue.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credentials: None,
            network: None,
            queue: None,
            events: None,
            interceptors: Vec::new(),
            http: None,
        }
    }

    /// Defaults to an in-memory store.
    #[must_use]
    pub fn credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Defaults to a monitor that starts online.
    #[must_use]
    pub fn network(mut self, network: NetworkMonitor) -> Self {
        self.network = Some(network);
        self
    }

    /// Without a queue, offline requests simply fail.
    #[must_use]
    pub fn offline_queue(mut self, queue: Arc<OfflineQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Sink for session, rate-limit and queue events.
    #[must_use]
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Append a step after the built-in auth, tenant and trace steps.
    #[must_use]
    pub fn interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Override the transport built from `config.api`.
    #[must_use]
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Validate the configuration and assemble the client.
    pub fn build(self) -> Result<ApiClient, ConfigError> {
        self.config.validate()?;
        url::Url::parse(&self.config.api.base_url)
            .map_err(|err| ConfigError(format!("api.base_url is not a valid URL: {err}")))?;

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::from_config(&self.config.api)
                .map_err(|err| ConfigError(err.message))?,
        };
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(MemoryCredentialStore::default()));
        let events = self.events.unwrap_or_else(|| Arc::new(NullEventSink));

        let mut interceptors = default_pipeline(&credentials);
        interceptors.extend(self.interceptors);

        let refresher = TokenRefresher::new(
            http.clone(),
            self.config.api.url_for(&self.config.api.refresh_path),
            Arc::clone(&credentials),
            Arc::clone(&events),
        );

        Ok(ApiClient {
            config: self.config,
            http,
            credentials,
            interceptors,
            refresher,
            network: self.network.unwrap_or_default(),
            queue: self.queue,
            events,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> ApiClient {
        let mut config = ClientConfig::new(server.uri());
        config.api.max_attempts = 1;
        ApiClient::builder(config).build().unwrap()
    }

    #[tokio::test]
    async fn get_unwraps_envelope_and_sends_trace_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/screens"))
            .and(header_exists("x-request-id"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "data": [{ "id": "s1" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let screens: Vec<Value> = client_for(&server).get("/screens").await.unwrap();
        assert_eq!(screens, vec![json!({ "id": "s1" })]);
    }

    #[tokio::test]
    async fn stored_tenant_is_attached() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/playlists/7"))
            .and(header("x-tenant-id", "tenant-a"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.set_tenant(Some("tenant-a")).await.unwrap();
        client.delete::<()>("/playlists/7").await.unwrap();
        assert_eq!(client.tenant().await.unwrap().as_deref(), Some("tenant-a"));
    }

    #[tokio::test]
    async fn forbidden_maps_to_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(403).set_body_json(json!({ "message": "admins only" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .put::<Value, _>("/settings", &json!({ "theme": "dark" }))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::PermissionDenied);
        assert_eq!(err.message, "admins only");
    }

    #[tokio::test]
    async fn health_check_never_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
            .mount(&server)
            .await;

        assert!(client_for(&server).health_check().await);

        let mut config = ClientConfig::new("http://127.0.0.1:9");
        config.api.max_attempts = 1;
        let unreachable = ApiClient::builder(config).build().unwrap();
        assert!(!unreachable.health_check().await);
    }

    #[tokio::test]
    async fn invalid_content_type_is_rejected_locally() {
        let server = MockServer::start().await;
        let file = UploadFile::new("a.png", "not a mime", vec![1, 2, 3]);

        let err = client_for(&server)
            .upload_file::<Value>("/media", file, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Validation);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn build_rejects_invalid_config() {
        assert!(ApiClient::builder(ClientConfig::new("")).build().is_err());
        assert!(ApiClient::builder(ClientConfig::new("http://exa mple.com")).build().is_err());
    }
}
