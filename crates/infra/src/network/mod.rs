//! Connectivity tracking

pub mod monitor;
pub mod probe;

pub use monitor::NetworkMonitor;
pub use probe::{ConnectivityProbe, HealthProbe};
