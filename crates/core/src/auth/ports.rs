//! Port interface for the persistent credential store
//!
//! The store holds the access/refresh token pair and the active tenant id.
//! Only the refresh protocol and explicit session calls write to it; every
//! outbound request reads it.

use async_trait::async_trait;
use signage_domain::{StoreResult, TokenPair};

/// Persistent holder of the session credentials.
///
/// # Example
///
/// ```no_run
/// use signage_core::CredentialStore;
///
/// async fn bearer(store: &impl CredentialStore) -> Option<String> {
///     store.load_tokens().await.ok().flatten().map(|pair| pair.access_token)
/// }
/// ```
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current token pair, if the user is signed in.
    async fn load_tokens(&self) -> StoreResult<Option<TokenPair>>;

    /// Replace both tokens in one write.
    async fn save_tokens(&self, tokens: &TokenPair) -> StoreResult<()>;

    /// Forget the token pair. Idempotent.
    async fn clear_tokens(&self) -> StoreResult<()>;

    /// Active tenant id, if any.
    async fn tenant(&self) -> StoreResult<Option<String>>;

    /// Switch (or with `None`, drop) the active tenant.
    async fn set_tenant(&self, tenant: Option<&str>) -> StoreResult<()>;
}
