//! Process-local credential store

use async_trait::async_trait;
use parking_lot::RwLock;
use signage_core::CredentialStore;
use signage_domain::{StoreResult, TokenPair};

#[derive(Debug, Default)]
struct Session {
    tokens: Option<TokenPair>,
    tenant: Option<String>,
}

/// Credentials kept in memory for the lifetime of the process.
///
/// Suitable for tests and for embedders that persist credentials
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Session>,
}

impl MemoryCredentialStore {
    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self { session: RwLock::new(Session { tokens: Some(tokens), tenant: None }) }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load_tokens(&self) -> StoreResult<Option<TokenPair>> {
        Ok(self.session.read().tokens.clone())
    }

    async fn save_tokens(&self, tokens: &TokenPair) -> StoreResult<()> {
        self.session.write().tokens = Some(tokens.clone());
        Ok(())
    }

    async fn clear_tokens(&self) -> StoreResult<()> {
        self.session.write().tokens = None;
        Ok(())
    }

    async fn tenant(&self) -> StoreResult<Option<String>> {
        Ok(self.session.read().tenant.clone())
    }

    async fn set_tenant(&self, tenant: Option<&str>) -> StoreResult<()> {
        self.session.write().tenant = tenant.map(str::to_owned);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tokens_are_replaced_and_cleared() {
        let store = MemoryCredentialStore::with_tokens(TokenPair::new("a1", "r1"));

        store.save_tokens(&TokenPair::new("a2", "r2")).await.unwrap();
        assert_eq!(store.load_tokens().await.unwrap().unwrap().access_token, "a2");

        store.clear_tokens().await.unwrap();
        store.clear_tokens().await.unwrap();
        assert!(store.load_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clearing_tokens_keeps_tenant() {
        let store = MemoryCredentialStore::default();
        store.set_tenant(Some("t-1")).await.unwrap();
        store.clear_tokens().await.unwrap();
        assert_eq!(store.tenant().await.unwrap().as_deref(), Some("t-1"));
    }
}
