//! SQLite cache store implementation.
//!
//! Entries live in `cache_entries` with an optional expiry in unix epoch
//! milliseconds. Every write goes through the single-connection writer pool,
//! and `increment` is one `INSERT ... ON CONFLICT DO UPDATE ... RETURNING`
//! statement, so concurrent increments never lose updates.

use std::time::Duration;

use chrono::Utc;
use hookgate_core::store::{CacheStore, CounterState};
use hookgate_types::error::StoreError;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CacheStore`.
pub struct SqliteCacheStore {
    pool: DatabasePool,
}

impl SqliteCacheStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            "SELECT value FROM cache_entries WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(backend)?;

        row.map(|r| r.try_get::<String, _>("value"))
            .transpose()
            .map_err(backend)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| now_millis().saturating_add(duration_millis(ttl)));

        sqlx::query(
            r#"INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
               ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 expires_at = excluded.expires_at"#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool.writer)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState, StoreError> {
        let now = now_millis();
        let fresh_expiry = now.saturating_add(duration_millis(window));

        // ?1 key, ?2 now, ?3 expiry for a new window.
        // The WHERE clause refuses to touch a live non-numeric value; in that
        // case no row is returned.
        let row = sqlx::query(
            r#"INSERT INTO cache_entries (key, value, expires_at) VALUES (?1, '1', ?3)
               ON CONFLICT(key) DO UPDATE SET
                 value = CASE
                   WHEN cache_entries.expires_at IS NOT NULL AND cache_entries.expires_at <= ?2 THEN '1'
                   ELSE CAST(CAST(cache_entries.value AS INTEGER) + 1 AS TEXT)
                 END,
                 expires_at = CASE
                   WHEN cache_entries.expires_at IS NULL OR cache_entries.expires_at <= ?2 THEN ?3
                   ELSE cache_entries.expires_at
                 END
               WHERE (cache_entries.expires_at IS NOT NULL AND cache_entries.expires_at <= ?2)
                  OR CAST(CAST(cache_entries.value AS INTEGER) AS TEXT) = cache_entries.value
               RETURNING value, expires_at"#,
        )
        .bind(key)
        .bind(now)
        .bind(fresh_expiry)
        .fetch_optional(&self.pool.writer)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Err(StoreError::NotACounter {
                key: key.to_string(),
            });
        };

        let value: String = row.try_get("value").map_err(backend)?;
        let expires_at: Option<i64> = row.try_get("expires_at").map_err(backend)?;
        let count = value.parse::<u64>().map_err(|_| StoreError::NotACounter {
            key: key.to_string(),
        })?;
        let ttl_ms = expires_at.unwrap_or(fresh_expiry).saturating_sub(now).max(0);

        Ok(CounterState {
            count,
            ttl: Duration::from_millis(ttl_ms as u64),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM cache_entries WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now_millis())
                .execute(&self.pool.writer)
                .await
                .map_err(backend)?;
        Ok(result.rows_affected())
    }
}
