//! Request pipeline steps applied to every outbound request

use std::sync::Arc;

use async_trait::async_trait;
use signage_core::CredentialStore;
use signage_domain::constants::{HEADER_REQUEST_ID, HEADER_TENANT_ID};
use signage_domain::ApiResult;
use tracing::warn;
use uuid::Uuid;

use super::request::OutboundRequest;

/// One step of the outbound request pipeline.
///
/// Steps run in registration order. Returning an error aborts the request
/// before anything is sent.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: &mut OutboundRequest) -> ApiResult<()>;
}

/// Attaches `Authorization: Bearer <access>` from the credential store.
///
/// Always overwrites, so replayed requests carry the current token.
pub struct BearerAuthInterceptor {
    credentials: Arc<dyn CredentialStore>,
}

impl BearerAuthInterceptor {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuthInterceptor {
    async fn intercept(&self, request: &mut OutboundRequest) -> ApiResult<()> {
        match self.credentials.load_tokens().await {
            Ok(Some(tokens)) => request.set_bearer(&tokens.access_token),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Could not read access token; sending without it"),
        }
        Ok(())
    }
}

/// Attaches the active tenant unless the request already names one.
pub struct TenantInterceptor {
    credentials: Arc<dyn CredentialStore>,
}

impl TenantInterceptor {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl RequestInterceptor for TenantInterceptor {
    async fn intercept(&self, request: &mut OutboundRequest) -> ApiResult<()> {
        if request.header(HEADER_TENANT_ID).is_some() {
            return Ok(());
        }
        match self.credentials.tenant().await {
            Ok(Some(tenant)) => request.set_header(HEADER_TENANT_ID, tenant),
            Ok(None) => {}
            Err(err) => warn!(error = %err, "Could not read active tenant"),
        }
        Ok(())
    }
}

/// Tags the request with a fresh UUID v4 trace id.
#[derive(Debug, Default)]
pub struct RequestIdInterceptor;

#[async_trait]
impl RequestInterceptor for RequestIdInterceptor {
    async fn intercept(&self, request: &mut OutboundRequest) -> ApiResult<()> {
        request.set_header_if_absent(HEADER_REQUEST_ID, || Uuid::new_v4().to_string());
        Ok(())
    }
}

/// Built-in pipeline: bearer token, tenant, trace id.
pub fn default_pipeline(
    credentials: &Arc<dyn CredentialStore>,
) -> Vec<Arc<dyn RequestInterceptor>> {
    vec![
        Arc::new(BearerAuthInterceptor::new(Arc::clone(credentials))),
        Arc::new(TenantInterceptor::new(Arc::clone(credentials))),
        Arc::new(RequestIdInterceptor),
    ]
}
