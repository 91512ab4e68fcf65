//! Single-flight access token refresh
//!
//! At most one refresh call is in flight. Callers that hit a 401 while a
//! refresh is running await the same shared future instead of starting their
//! own. A caller whose rejected token has already been replaced gets the
//! current pair back without any network traffic.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::json;
use signage_core::{CredentialStore, EventSink};
use signage_domain::{ApiError, ApiResult, ClientEvent, RefreshResponse, TokenPair};
use tracing::{debug, error, info, instrument, warn};

use super::response;
use crate::http::HttpClient;

type RefreshFuture = Shared<BoxFuture<'static, ApiResult<TokenPair>>>;

/// Coordinates token refreshes for one client.
#[derive(Clone)]
pub struct TokenRefresher {
    inner: Arc<Inner>,
}

struct Inner {
    http: HttpClient,
    refresh_url: String,
    credentials: Arc<dyn CredentialStore>,
    events: Arc<dyn EventSink>,
    state: Mutex<RefreshState>,
    generation: AtomicU64,
    refresh_calls: AtomicUsize,
}

#[derive(Default)]
struct RefreshState {
    in_flight: Option<(u64, RefreshFuture)>,
    last_rotation: Option<Rotation>,
}

/// The most recent successful refresh and the access token it replaced.
struct Rotation {
    replaced: String,
    pair: TokenPair,
}

impl TokenRefresher {
    pub fn new(
        http: HttpClient,
        refresh_url: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                refresh_url: refresh_url.into(),
                credentials,
                events,
                state: Mutex::new(RefreshState::default()),
                generation: AtomicU64::new(0),
                refresh_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of refresh calls that actually went out on the wire.
    pub fn refresh_count(&self) -> usize {
        self.inner.refresh_calls.load(Ordering::SeqCst)
    }

    /// Obtain a usable token pair after `stale_access` was rejected.
    ///
    /// Fails with `unauthorized` when there is no session to refresh, or
    /// with the refresh call's own error. On refresh failure the stored
    /// tokens are purged and [`ClientEvent::SessionExpired`] is published
    /// exactly once, no matter how many callers were waiting.
    #[instrument(skip_all)]
    pub async fn refresh(&self, stale_access: Option<&str>) -> ApiResult<TokenPair> {
        let current = self.inner.credentials.load_tokens().await?;
        let Some(current) = current else {
            return Err(ApiError::unauthorized("no session to refresh"));
        };

        if stale_access != Some(current.access_token.as_str()) {
            debug!("Token already rotated; retrying with the current one");
            return Ok(current);
        }

        let (generation, flight) = {
            let mut state = self.inner.state.lock();
            let running = state
                .in_flight
                .as_ref()
                .filter(|(_, flight)| flight.peek().is_none())
                .map(|(generation, flight)| (*generation, flight.clone()));

            if let Some(running) = running {
                debug!("Joining in-flight token refresh");
                running
            } else {
                if let Some(rotation) = &state.last_rotation {
                    if rotation.replaced == current.access_token {
                        return Ok(rotation.pair.clone());
                    }
                }
                let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let flight = perform_refresh(Arc::clone(&self.inner), current).boxed().shared();
                state.in_flight = Some((generation, flight.clone()));
                (generation, flight)
            }
        };

        let outcome = flight.await;

        let mut state = self.inner.state.lock();
        if matches!(&state.in_flight, Some((slot, _)) if *slot == generation) {
            state.in_flight = None;
        }
        outcome
    }
}

async fn perform_refresh(inner: Arc<Inner>, current: TokenPair) -> ApiResult<TokenPair> {
    inner.refresh_calls.fetch_add(1, Ordering::SeqCst);
    info!("Refreshing access token");

    match request_new_pair(&inner, &current).await {
        Ok(pair) => {
            inner.credentials.save_tokens(&pair).await?;
            inner.state.lock().last_rotation =
                Some(Rotation { replaced: current.access_token, pair: pair.clone() });
            info!("Access token refreshed");
            Ok(pair)
        }
        Err(err) => {
            warn!(error = %err, "Token refresh failed; ending session");
            if let Err(store_err) = inner.credentials.clear_tokens().await {
                error!(error = %store_err, "Failed to purge credentials after refresh failure");
            }
            inner.events.publish(ClientEvent::SessionExpired { message: err.message.clone() });
            Err(err)
        }
    }
}

async fn request_new_pair(inner: &Inner, current: &TokenPair) -> ApiResult<TokenPair> {
    let body = json!({ "refresh_token": current.refresh_token });
    let response = inner
        .http
        .send(|client| Ok(client.post(&inner.refresh_url).json(&body)))
        .await?;
    let refreshed: RefreshResponse = response::decode(response).await?;
    Ok(refreshed.into_pair(&current.refresh_token))
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("refresh_url", &self.inner.refresh_url)
            .field("refresh_calls", &self.refresh_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use signage_core::NullEventSink;
    use signage_domain::ApiErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::credentials::MemoryCredentialStore;

    fn refresher(server: &MockServer, store: Arc<MemoryCredentialStore>) -> TokenRefresher {
        let http = HttpClient::builder()
            .max_attempts(1)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        TokenRefresher::new(
            http,
            format!("{}/auth/refresh", server.uri()),
            store,
            Arc::new(NullEventSink),
        )
    }

    #[tokio::test]
    async fn refresh_rotates_and_persists_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({ "refresh_token": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "access_token": "a2", "refresh_token": "r2" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_tokens(TokenPair::new("a1", "r1")));
        let refresher = refresher(&server, Arc::clone(&store));

        let pair = refresher.refresh(Some("a1")).await.unwrap();
        assert_eq!(pair.access_token, "a2");
        assert_eq!(store.load_tokens().await.unwrap().unwrap().refresh_token, "r2");

        // A late caller still holding a1 reuses the rotation.
        let again = refresher.refresh(Some("a1")).await.unwrap();
        assert_eq!(again.access_token, "a2");
        assert_eq!(refresher.refresh_count(), 1);
    }

    #[tokio::test]
    async fn missing_session_fails_without_network() {
        let server = MockServer::start().await;
        let refresher = refresher(&server, Arc::new(MemoryCredentialStore::default()));

        let err = refresher.refresh(Some("a1")).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Unauthorized);
        assert_eq!(refresher.refresh_count(), 0);
    }

    #[tokio::test]
    async fn rejected_refresh_clears_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "message": "refresh revoked" })),
            )
            .mount(&server)
            .await;

        let store = Arc::new(MemoryCredentialStore::with_tokens(TokenPair::new("a1", "r1")));
        let refresher = refresher(&server, Arc::clone(&store));

        let err = refresher.refresh(Some("a1")).await.unwrap_err();
        assert_eq!(err.message, "refresh revoked");
        assert!(store.load_tokens().await.unwrap().is_none());
    }
}
