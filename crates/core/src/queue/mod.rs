//! Offline queue: ports and the drain service

pub mod ports;
pub mod service;

pub use ports::{OfflineQueueStore, RequestReplayer};
pub use service::OfflineQueue;
