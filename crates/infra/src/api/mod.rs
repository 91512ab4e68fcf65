//! Signage API client
//!
//! This module provides the HTTP-facing half of the client: the request
//! pipeline, response normalization, token refresh and the [`ApiClient`]
//! that ties them together.
//!
//! # Architecture
//!
//! - Transport retries live in [`crate::http::HttpClient`]
//! - Interceptors attach auth, tenant and trace headers
//! - Single-flight token refresh on 401
//! - Offline requests are diverted to the [`signage_core::OfflineQueue`]

pub mod auth;
pub mod client;
pub mod interceptors;
pub mod request;
mod response;

pub use auth::TokenRefresher;
pub use client::{ApiClient, ApiClientBuilder, ProgressCallback};
pub use interceptors::{
    default_pipeline, BearerAuthInterceptor, RequestIdInterceptor, RequestInterceptor,
    TenantInterceptor,
};
pub use request::OutboundRequest;
