//! Client context - wires configuration, storage and the API client

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use signage_core::OfflineQueue;
use signage_domain::ClientConfig;
use signage_infra::{
    ApiClient, ClientEvents, DbManager, NetworkMonitor, SqliteCredentialStore,
    SqliteOfflineQueueStore,
};
use tracing::info;

/// Connection pool size for the local store; the CLI is mostly sequential.
const DB_POOL_SIZE: u32 = 4;

/// Everything a command needs, built once at start-up.
pub struct ClientContext {
    pub config: ClientConfig,
    pub db: Arc<DbManager>,
    pub client: Arc<ApiClient>,
    pub queue: Arc<OfflineQueue>,
    pub network: NetworkMonitor,
    pub events: ClientEvents,
}

impl ClientContext {
    pub fn new(config: ClientConfig) -> Result<Self> {
        ensure_parent_dir(&config.offline.db_path)?;

        let db = DbManager::new(&config.offline.db_path, DB_POOL_SIZE)
            .with_context(|| format!("failed to open {}", config.offline.db_path))?;
        db.run_migrations().context("failed to apply schema")?;
        let db = Arc::new(db);

        let events = ClientEvents::default();
        let network = NetworkMonitor::default().with_events(Arc::new(events.clone()));
        let credentials = Arc::new(SqliteCredentialStore::new(Arc::clone(&db)));
        let queue = Arc::new(
            OfflineQueue::new(Arc::new(SqliteOfflineQueueStore::new(Arc::clone(&db))))
                .with_events(Arc::new(events.clone())),
        );

        let client = ApiClient::builder(config.clone())
            .credentials(credentials)
            .network(network.clone())
            .offline_queue(Arc::clone(&queue))
            .events(Arc::new(events.clone()))
            .build()?;

        info!(
            base_url = %config.api.base_url,
            db_path = %db.path().display(),
            offline_enabled = config.offline.enabled,
            "Client context initialized"
        );

        Ok(Self { config, db, client: Arc::new(client), queue, network, events })
    }
}

fn ensure_parent_dir(db_path: &str) -> Result<()> {
    match Path::new(db_path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display())),
        _ => Ok(()),
    }
}
