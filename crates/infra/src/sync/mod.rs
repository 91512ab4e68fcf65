//! Background synchronization of the offline queue
//!
//! The worker follows the same lifecycle rules as every background task in
//! this crate: join handles are tracked, cancellation is explicit, and each
//! drain runs under a timeout.

mod errors;
pub mod offline_sync_worker;

pub use errors::WorkerError;
pub use offline_sync_worker::{OfflineSyncWorker, OfflineSyncWorkerConfig};
