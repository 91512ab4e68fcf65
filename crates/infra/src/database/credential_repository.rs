//! SQLite-backed credential store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rusqlite::{params, OptionalExtension};
use signage_core::CredentialStore;
use signage_domain::{StoreError, StoreResult, TokenPair};
use tokio::task;

use super::manager::DbManager;
use crate::errors::IntoStoreError;

/// Session tokens and the active tenant, kept in the single `credentials`
/// row so they survive restarts.
pub struct SqliteCredentialStore {
    db: Arc<DbManager>,
}

impl SqliteCredentialStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> StoreResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || {
            let conn = db.get_connection()?;
            op(&conn)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn load_tokens(&self) -> StoreResult<Option<TokenPair>> {
        self.run(|conn| {
            let row = conn
                .query_row(
                    "SELECT access_token, refresh_token, expires_at FROM credentials WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, Option<String>>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<i64>>(2)?,
                        ))
                    },
                )
                .optional()
                .map_err(IntoStoreError::into_store_error)?;

            let Some((Some(access), Some(refresh), expires_at)) = row else {
                return Ok(None);
            };

            let pair = TokenPair::new(access, refresh);
            match expires_at {
                Some(millis) => {
                    let at = Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                        StoreError::Invalid(format!("token expiry out of range: {millis}"))
                    })?;
                    Ok(Some(pair.with_expiry(at)))
                }
                None => Ok(Some(pair)),
            }
        })
        .await
    }

    async fn save_tokens(&self, tokens: &TokenPair) -> StoreResult<()> {
        let tokens = tokens.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO credentials (id, access_token, refresh_token, expires_at, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    access_token = excluded.access_token,
                    refresh_token = excluded.refresh_token,
                    expires_at = excluded.expires_at,
                    updated_at = excluded.updated_at",
                params![
                    tokens.access_token,
                    tokens.refresh_token,
                    tokens.expires_at.map(|at| at.timestamp_millis()),
                    Utc::now().timestamp_millis(),
                ],
            )
            .map_err(IntoStoreError::into_store_error)?;
            Ok(())
        })
        .await
    }

    async fn clear_tokens(&self) -> StoreResult<()> {
        self.run(|conn| {
            conn.execute(
                "UPDATE credentials
                 SET access_token = NULL, refresh_token = NULL, expires_at = NULL, updated_at = ?1
                 WHERE id = 1",
                params![Utc::now().timestamp_millis()],
            )
            .map_err(IntoStoreError::into_store_error)?;
            Ok(())
        })
        .await
    }

    async fn tenant(&self) -> StoreResult<Option<String>> {
        self.run(|conn| {
            conn.query_row("SELECT tenant_id FROM credentials WHERE id = 1", [], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()
            .map(Option::flatten)
            .map_err(IntoStoreError::into_store_error)
        })
        .await
    }

    async fn set_tenant(&self, tenant: Option<&str>) -> StoreResult<()> {
        let tenant = tenant.map(str::to_owned);
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO credentials (id, tenant_id, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                    tenant_id = excluded.tenant_id,
                    updated_at = excluded.updated_at",
                params![tenant, Utc::now().timestamp_millis()],
            )
            .map_err(IntoStoreError::into_store_error)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn setup_store() -> (SqliteCredentialStore, TempDir) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = DbManager::new(temp_dir.path().join("creds.db"), 2).expect("manager created");
        manager.run_migrations().expect("migrations applied");
        (SqliteCredentialStore::new(Arc::new(manager)), temp_dir)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn tokens_survive_a_new_store_instance() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let path = temp_dir.path().join("creds.db");
        let expiry = Utc.timestamp_millis_opt(Utc::now().timestamp_millis()).unwrap()
            + Duration::minutes(15);

        {
            let manager = DbManager::new(&path, 1).unwrap();
            manager.run_migrations().unwrap();
            let store = SqliteCredentialStore::new(Arc::new(manager));
            store.save_tokens(&TokenPair::new("a1", "r1").with_expiry(expiry)).await.unwrap();
        }

        let store = SqliteCredentialStore::new(Arc::new(DbManager::new(&path, 1).unwrap()));
        let tokens = store.load_tokens().await.unwrap().unwrap();
        assert_eq!(tokens.access_token, "a1");
        assert_eq!(tokens.expires_at, Some(expiry));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn clearing_tokens_keeps_tenant() {
        let (store, _dir) = setup_store();
        assert!(store.load_tokens().await.unwrap().is_none());
        assert!(store.tenant().await.unwrap().is_none());

        store.set_tenant(Some("tenant-a")).await.unwrap();
        store.save_tokens(&TokenPair::new("a1", "r1")).await.unwrap();
        store.clear_tokens().await.unwrap();

        assert!(store.load_tokens().await.unwrap().is_none());
        assert_eq!(store.tenant().await.unwrap().as_deref(), Some("tenant-a"));

        store.set_tenant(None).await.unwrap();
        assert!(store.tenant().await.unwrap().is_none());
    }
}
