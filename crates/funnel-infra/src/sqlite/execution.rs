//! SQLite-backed execution snapshot cache.
//!
//! Implements `ExecutionCache` from `funnel-core`. Each key holds the latest
//! snapshot as JSON text; expiry is an epoch-millisecond column so expired
//! rows are invisible to reads and can be purged in one statement.

use chrono::Utc;
use funnel_core::repository::cache::{CacheError, ExecutionCache};
use funnel_types::execution::ExecutionContext;
use sqlx::Row;

use super::pool::DatabasePool;

pub struct SqliteExecutionCache {
    pool: DatabasePool,
}

impl SqliteExecutionCache {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Delete expired snapshots. Returns how many rows were removed.
    pub async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM execution_snapshots WHERE expires_at <= ?")
            .bind(now_millis())
            .execute(&self.pool.writer)
            .await
            .map_err(storage_error)?;
        Ok(result.rows_affected())
    }

    /// Latest live snapshots for a funnel, newest first.
    pub async fn list_for_funnel(&self, funnel_id: &str, limit: u32) -> Result<Vec<ExecutionContext>, CacheError> {
        let rows = sqlx::query(
            "SELECT snapshot FROM execution_snapshots \
             WHERE funnel_id = ? AND expires_at > ? \
             ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(funnel_id)
        .bind(now_millis())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| {
                let snapshot: String = row.try_get("snapshot").map_err(storage_error)?;
                decode(&snapshot)
            })
            .collect()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn storage_error(e: sqlx::Error) -> CacheError {
    CacheError::Storage(e.to_string())
}

fn decode(snapshot: &str) -> Result<ExecutionContext, CacheError> {
    serde_json::from_str(snapshot).map_err(|e| CacheError::Serialization(format!("invalid snapshot JSON: {e}")))
}

impl ExecutionCache for SqliteExecutionCache {
    async fn get(&self, key: &str) -> Result<Option<ExecutionContext>, CacheError> {
        let row = sqlx::query("SELECT snapshot FROM execution_snapshots WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(now_millis())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(storage_error)?;

        match row {
            Some(row) => {
                let snapshot: String = row.try_get("snapshot").map_err(storage_error)?;
                decode(&snapshot).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, context: &ExecutionContext, ttl_secs: u64) -> Result<(), CacheError> {
        let snapshot = serde_json::to_string(context).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let ttl_millis = i64::try_from(ttl_secs.saturating_mul(1_000)).unwrap_or(i64::MAX);
        let expires_at = now_millis().saturating_add(ttl_millis);

        sqlx::query(
            "INSERT INTO execution_snapshots (key, execution_id, funnel_id, status, snapshot, updated_at, expires_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET \
                status = excluded.status, \
                snapshot = excluded.snapshot, \
                updated_at = excluded.updated_at, \
                expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(context.id.to_string())
        .bind(&context.funnel_id)
        .bind(context.status.as_str())
        .bind(snapshot)
        .bind(Utc::now().to_rfc3339())
        .bind(expires_at)
        .execute(&self.pool.writer)
        .await
        .map_err(storage_error)?;

        Ok(())
    }
}
