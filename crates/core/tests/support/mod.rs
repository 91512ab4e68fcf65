//! Shared test helpers for `signage-core` integration tests.
//!
//! Lightweight in-memory stand-ins for the queue ports so drain tests can
//! focus on ordering and retry behaviour.

pub mod queue;
