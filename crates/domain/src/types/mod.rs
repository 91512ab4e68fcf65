//! Domain types and models

pub mod auth;
pub mod events;
pub mod queue;
pub mod request;
pub mod upload;

pub use auth::{RefreshResponse, TokenPair};
pub use events::{ClientEvent, NetworkStatus, RateLimitSeverity};
pub use queue::{DrainReport, OfflineQueueItem, Priority, QueueStats};
pub use request::{HttpMethod, RequestOptions, StoredRequest};
pub use upload::{UploadFile, UploadProgress};
