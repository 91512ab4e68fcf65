//! SQLite persistence for the offline queue and credentials

pub mod credential_repository;
pub mod manager;
pub mod offline_queue_repository;

pub use credential_repository::SqliteCredentialStore;
pub use manager::{DbManager, SqliteConnection};
pub use offline_queue_repository::SqliteOfflineQueueStore;
