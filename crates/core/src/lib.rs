//! # Signage Core
//!
//! Client resilience logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for credentials, queue storage, replay and
//!   events
//! - The offline queue service and its drain algorithm
//! - Rate-limit advisory policy
//!
//! ## Architecture Principles
//! - Only depends on `signage-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod auth;
pub mod queue;
pub mod rate_limit;

// Infrastructure ports
pub mod event_ports;

pub use auth::ports::CredentialStore;
pub use event_ports::{EventSink, NullEventSink};
pub use queue::ports::{OfflineQueueStore, RequestReplayer};
pub use queue::OfflineQueue;
pub use rate_limit::classify_remaining;
