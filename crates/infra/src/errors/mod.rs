//! Error conversions at the infrastructure boundary

pub mod conversions;

pub(crate) use conversions::{IntoApiError, IntoStoreError};
