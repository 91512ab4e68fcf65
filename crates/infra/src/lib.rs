//! # Signage Infrastructure
//!
//! Infrastructure implementations of the core client ports.
//!
//! This crate contains:
//! - The HTTP transport and the [`ApiClient`]
//! - SQLite stores for the offline queue and credentials
//! - Network monitoring and the offline sync worker
//! - Configuration loading and the event bus
//!
//! ## Architecture
//! - Implements traits defined in `signage-core`
//! - Depends on `signage-domain` and `signage-core`
//! - Contains all "impure" code (network, disk, background tasks)

pub mod api;
pub mod config;
pub mod credentials;
pub mod database;
mod errors;
pub mod events;
pub mod http;
pub mod network;
pub mod sync;

// Re-export commonly used items
pub use api::{ApiClient, ApiClientBuilder, OutboundRequest, ProgressCallback, RequestInterceptor};
pub use credentials::MemoryCredentialStore;
pub use database::{DbManager, SqliteCredentialStore, SqliteOfflineQueueStore};
pub use events::ClientEvents;
pub use http::HttpClient;
pub use network::{ConnectivityProbe, HealthProbe, NetworkMonitor};
pub use sync::{OfflineSyncWorker, OfflineSyncWorkerConfig, WorkerError};
