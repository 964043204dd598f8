//! In-memory cache store backed by `DashMap`.
//!
//! Entries are updated under the map's per-shard lock, which makes
//! `increment` atomic without any global locking. Expiry uses tokio's clock.

use std::time::Duration;

use dashmap::DashMap;
use hookgate_core::store::{CacheStore, CounterState};
use hookgate_types::error::StoreError;
use tokio::time::Instant;

#[derive(Debug, Clone)]
enum StoredValue {
    Text(String),
    Counter(u64),
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Process-local `CacheStore`. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .entries
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| match &e.value {
                StoredValue::Text(s) => s.clone(),
                StoredValue::Counter(n) => n.to_string(),
            }))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let entry = CacheEntry {
            value: StoredValue::Text(value.to_string()),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState, StoreError> {
        let now = Instant::now();
        let fresh = || CacheEntry {
            value: StoredValue::Counter(0),
            expires_at: Some(now + window),
        };

        let mut entry = self.entries.entry(key.to_string()).or_insert_with(fresh);
        if !entry.is_live(now) {
            *entry = fresh();
        }

        let count = match &entry.value {
            StoredValue::Counter(n) => n + 1,
            StoredValue::Text(s) => {
                s.parse::<u64>().map_err(|_| StoreError::NotACounter {
                    key: key.to_string(),
                })? + 1
            }
        };
        entry.value = StoredValue::Counter(count);
        let expires_at = *entry.expires_at.get_or_insert(now + window);

        Ok(CounterState {
            count,
            ttl: expires_at.saturating_duration_since(now),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Instant::now();
        let mut removed = 0u64;
        self.entries.retain(|_, e| {
            let live = e.is_live(now);
            if !live {
                removed += 1;
            }
            live
        });
        Ok(removed)
    }
}
