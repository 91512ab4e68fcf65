//! Credential store implementations
//!
//! The SQLite-backed store lives with the other repositories in
//! [`crate::database`].

pub mod memory;

pub use memory::MemoryCredentialStore;
