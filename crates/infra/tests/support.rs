//! Shared fixtures for infra integration tests.

use std::sync::{Arc, Once};

use signage_core::{CredentialStore, OfflineQueue};
use signage_domain::{ClientConfig, ClientEvent, TokenPair};
use signage_infra::{
    ApiClient, ClientEvents, DbManager, NetworkMonitor, SqliteCredentialStore,
    SqliteOfflineQueueStore,
};
use tempfile::TempDir;
use tokio::sync::broadcast;
use wiremock::MockServer;

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("signage_infra=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let manager = DbManager::new(temp_dir.path().join("signage.db"), 4)
            .expect("db manager should be created");
        manager.run_migrations().expect("migrations should apply");
        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

/// Client wired to a mock server with real SQLite stores.
pub struct TestClient {
    pub client: Arc<ApiClient>,
    pub queue: Arc<OfflineQueue>,
    pub credentials: Arc<SqliteCredentialStore>,
    pub network: NetworkMonitor,
    pub events: ClientEvents,
    pub db: TestDatabase,
}

impl TestClient {
    pub async fn new(server: &MockServer) -> Self {
        Self::with_config(test_config(server)).await
    }

    pub async fn with_config(config: ClientConfig) -> Self {
        init_tracing();

        let db = TestDatabase::new();
        let events = ClientEvents::default();
        let network = NetworkMonitor::default().with_events(Arc::new(events.clone()));
        let credentials = Arc::new(SqliteCredentialStore::new(Arc::clone(&db.manager)));
        let queue = Arc::new(
            OfflineQueue::new(Arc::new(SqliteOfflineQueueStore::new(Arc::clone(&db.manager))))
                .with_events(Arc::new(events.clone())),
        );

        let client = ApiClient::builder(config)
            .credentials(credentials.clone())
            .network(network.clone())
            .offline_queue(Arc::clone(&queue))
            .events(Arc::new(events.clone()))
            .build()
            .expect("client should build");

        Self { client: Arc::new(client), queue, credentials, network, events, db }
    }

    /// Sign in with the given access token and refresh token `r1`.
    pub async fn sign_in(&self, access: &str) {
        self.credentials
            .save_tokens(&TokenPair::new(access, "r1"))
            .await
            .expect("tokens should be stored");
    }

    pub async fn access_token(&self) -> Option<String> {
        self.credentials
            .load_tokens()
            .await
            .expect("tokens should load")
            .map(|tokens| tokens.access_token)
    }
}

/// Fast-retry configuration pointed at the mock server.
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::new(server.uri());
    config.api.timeout_secs = 5;
    config.api.max_attempts = 3;
    config.api.base_backoff_ms = 1;
    config.api.max_backoff_ms = 5;
    config.offline.max_retries = 3;
    config
}

/// Events published so far, without waiting.
pub fn drain_events(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
