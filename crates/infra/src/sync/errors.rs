//! Lifecycle errors for background tasks

use std::time::Duration;

use thiserror::Error;

/// Failure to start or stop a background task.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Worker already running")]
    AlreadyRunning,

    #[error("Worker not running")]
    NotRunning,

    #[error("Worker task panicked: {0}")]
    Panicked(String),

    #[error("Worker task did not finish within {0:?}")]
    JoinTimeout(Duration),

    #[error("Invalid worker configuration: {0}")]
    InvalidConfig(String),
}
