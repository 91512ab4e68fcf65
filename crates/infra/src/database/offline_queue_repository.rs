//! SQLite-backed implementation of the offline queue store port.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};
use signage_core::OfflineQueueStore;
use signage_domain::{
    HttpMethod, OfflineQueueItem, Priority, QueueStats, StoreError, StoreResult, StoredRequest,
};
use tokio::task;
use tracing::warn;

use super::manager::{DbManager, SqliteConnection};
use crate::errors::IntoStoreError;

/// Offline queue persisted in the `offline_queue` table.
pub struct SqliteOfflineQueueStore {
    db: Arc<DbManager>,
}

impl SqliteOfflineQueueStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    fn insert_item(conn: &SqliteConnection, item: &OfflineQueueItem) -> StoreResult<()> {
        let request = &item.request;
        let body = request
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(IntoStoreError::into_store_error)?;
        let headers =
            serde_json::to_string(&request.headers).map_err(IntoStoreError::into_store_error)?;
        let dependencies = item
            .dependencies
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(IntoStoreError::into_store_error)?;

        conn.execute(
            QUEUE_INSERT_SQL,
            params![
                request.id,
                request.method.as_str(),
                request.url,
                body,
                headers,
                request.timestamp,
                request.retry_count,
                request.max_retries,
                item.priority.as_str(),
                item.priority.rank(),
                dependencies,
            ],
        )
        .map_err(IntoStoreError::into_store_error)?;
        Ok(())
    }

    fn fetch_items(
        conn: &SqliteConnection,
        priority: Option<Priority>,
    ) -> StoreResult<Vec<OfflineQueueItem>> {
        let rows = match priority {
            Some(priority) => {
                let mut stmt = conn
                    .prepare(QUEUE_SELECT_BY_PRIORITY_SQL)
                    .map_err(IntoStoreError::into_store_error)?;
                let rows = stmt
                    .query_map(params![priority.as_str()], map_queue_row)
                    .map_err(IntoStoreError::into_store_error)?;
                rows.collect::<Result<Vec<_>, _>>()
            }
            None => {
                let mut stmt =
                    conn.prepare(QUEUE_SELECT_SQL).map_err(IntoStoreError::into_store_error)?;
                let rows =
                    stmt.query_map([], map_queue_row).map_err(IntoStoreError::into_store_error)?;
                rows.collect::<Result<Vec<_>, _>>()
            }
        };

        rows.map_err(IntoStoreError::into_store_error)?.into_iter().map(RawQueueRow::into_item).collect()
    }

    fn compute_stats(conn: &SqliteConnection) -> StoreResult<QueueStats> {
        let mut stmt = conn.prepare(QUEUE_STATS_SQL).map_err(IntoStoreError::into_store_error)?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
            .map_err(IntoStoreError::into_store_error)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(IntoStoreError::into_store_error)?;

        let oldest_timestamp: Option<i64> = conn
            .query_row("SELECT MIN(timestamp) FROM offline_queue", [], |row| row.get(0))
            .map_err(IntoStoreError::into_store_error)?;

        let mut by_priority = BTreeMap::new();
        let mut total = 0_usize;
        for (priority, count) in counts {
            let count = usize::try_from(count).unwrap_or(0);
            total += count;
            by_priority.insert(priority, count);
        }

        Ok(QueueStats { total, by_priority, oldest_timestamp })
    }
}

#[async_trait]
impl OfflineQueueStore for SqliteOfflineQueueStore {
    async fn insert(&self, item: &OfflineQueueItem) -> StoreResult<()> {
        let db = Arc::clone(&self.db);
        let item = item.clone();

        task::spawn_blocking(move || -> StoreResult<()> {
            let conn = db.get_connection()?;
            Self::insert_item(&conn, &item)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }

    async fn list(&self, priority: Option<Priority>) -> StoreResult<Vec<OfflineQueueItem>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> StoreResult<Vec<OfflineQueueItem>> {
            let conn = db.get_connection()?;
            Self::fetch_items(&conn, priority)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }

    async fn remove(&self, id: &str) -> StoreResult<bool> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> StoreResult<bool> {
            let conn = db.get_connection()?;
            let affected = conn
                .execute("DELETE FROM offline_queue WHERE id = ?1", params![id])
                .map_err(IntoStoreError::into_store_error)?;
            Ok(affected > 0)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }

    async fn increment_retry(&self, id: &str) -> StoreResult<Option<u32>> {
        let db = Arc::clone(&self.db);
        let id = id.to_string();

        task::spawn_blocking(move || -> StoreResult<Option<u32>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "UPDATE offline_queue SET retry_count = retry_count + 1 WHERE id = ?1 RETURNING retry_count",
                params![id],
                |row| row.get::<_, u32>(0),
            )
            .optional()
            .map_err(IntoStoreError::into_store_error)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }

    async fn stats(&self) -> StoreResult<QueueStats> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> StoreResult<QueueStats> {
            let conn = db.get_connection()?;
            Self::compute_stats(&conn)
        })
        .await
        .map_err(IntoStoreError::into_store_error)?
    }
}

const QUEUE_INSERT_SQL: &str = "INSERT OR REPLACE INTO offline_queue (
        id, method, url, body, headers, timestamp, retry_count, max_retries,
        priority, priority_rank, dependencies
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";

const QUEUE_SELECT_SQL: &str = "SELECT
        id, method, url, body, headers, timestamp, retry_count, max_retries,
        priority, dependencies
    FROM offline_queue
    ORDER BY priority_rank DESC, timestamp ASC, id ASC";

const QUEUE_SELECT_BY_PRIORITY_SQL: &str = "SELECT
        id, method, url, body, headers, timestamp, retry_count, max_retries,
        priority, dependencies
    FROM offline_queue
    WHERE priority = ?1
    ORDER BY timestamp ASC, id ASC";

const QUEUE_STATS_SQL: &str =
    "SELECT priority, COUNT(*) FROM offline_queue GROUP BY priority";

/// Column values as read, before JSON and enum parsing.
struct RawQueueRow {
    id: String,
    method: String,
    url: String,
    body: Option<String>,
    headers: String,
    timestamp: i64,
    retry_count: u32,
    max_retries: u32,
    priority: String,
    dependencies: Option<String>,
}

fn map_queue_row(row: &Row<'_>) -> rusqlite::Result<RawQueueRow> {
    Ok(RawQueueRow {
        id: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        body: row.get(3)?,
        headers: row.get(4)?,
        timestamp: row.get(5)?,
        retry_count: row.get(6)?,
        max_retries: row.get(7)?,
        priority: row.get(8)?,
        dependencies: row.get(9)?,
    })
}

impl RawQueueRow {
    fn into_item(self) -> StoreResult<OfflineQueueItem> {
        let method = self.method.parse::<HttpMethod>().map_err(|err| {
            StoreError::Invalid(format!("queued request {} has bad method: {err}", self.id))
        })?;
        let priority = parse_priority(&self.id, &self.priority);
        let body: Option<serde_json::Value> = self
            .body
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(IntoStoreError::into_store_error)?;
        let headers: BTreeMap<String, String> =
            serde_json::from_str(&self.headers).map_err(IntoStoreError::into_store_error)?;
        let dependencies: Option<Vec<String>> = self
            .dependencies
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(IntoStoreError::into_store_error)?;

        Ok(OfflineQueueItem {
            request: StoredRequest {
                id: self.id,
                method,
                url: self.url,
                body,
                headers,
                timestamp: self.timestamp,
                retry_count: self.retry_count,
                max_retries: self.max_retries,
            },
            priority,
            dependencies,
        })
    }
}

fn parse_priority(id: &str, raw: &str) -> Priority {
    match raw.parse::<Priority>() {
        Ok(priority) => priority,
        Err(err) => {
            warn!(
                item_id = %id,
                raw_priority = %raw,
                error = %err,
                "invalid priority stored in offline queue; defaulting to medium"
            );
            Priority::Medium
        }
    }
}
