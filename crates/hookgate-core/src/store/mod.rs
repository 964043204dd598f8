//! Cache store port.
//!
//! Secret memoization and rate-limit counters both live behind this trait so
//! the backing store (in-memory, SQLite, ...) can be swapped by configuration.
//! Implementations live in hookgate-infra.

pub mod box_store;

pub use box_store::BoxCacheStore;

use std::time::Duration;

use hookgate_types::error::StoreError;

/// Snapshot of a fixed-window counter right after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// Value after the increment (1 for a fresh window).
    pub count: u64,
    /// Time left until the window expires and the counter disappears.
    pub ttl: Duration,
}

/// Key-value cache with per-entry expiry and atomic counters.
///
/// Expired entries must be invisible to `get` and must restart at 1 on
/// `increment`, whether or not they have been purged yet.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait CacheStore: Send + Sync {
    /// Get a live value. Returns None if missing or expired.
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Upsert a value. `ttl = None` keeps it until deleted.
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Atomically increment a counter.
    ///
    /// A missing or expired key starts a new window: count 1, expiring
    /// `window` from now. Later increments keep the original expiry.
    fn increment(
        &self,
        key: &str,
        window: Duration,
    ) -> impl std::future::Future<Output = Result<CounterState, StoreError>> + Send;

    /// Delete a key. No-op if the key does not exist.
    fn delete(&self, key: &str)
    -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Drop every expired entry. Returns how many were removed.
    fn purge_expired(&self) -> impl std::future::Future<Output = Result<u64, StoreError>> + Send;
}
