//! # Signage Domain
//!
//! Domain types shared by the signage API client crates.
//!
//! This crate contains:
//! - Request, queue and credential data types
//! - The normalized [`ApiError`] taxonomy and storage errors
//! - Configuration structures
//! - Header names and defaults
//!
//! ## Architecture
//! - No dependencies on other signage crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
