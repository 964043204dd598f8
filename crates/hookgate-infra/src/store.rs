//! Cache store selection and housekeeping.

use std::time::Duration;

use hookgate_core::store::{BoxCacheStore, CacheStore};
use hookgate_types::config::StoreBackend;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::memory::MemoryCacheStore;
use crate::sqlite::cache::SqliteCacheStore;
use crate::sqlite::pool::DatabasePool;

/// Build the configured cache store backend.
pub fn build_cache_store(backend: StoreBackend, pool: &DatabasePool) -> BoxCacheStore {
    tracing::info!(backend = ?backend, "cache store selected");
    match backend {
        StoreBackend::Memory => BoxCacheStore::new(MemoryCacheStore::new()),
        StoreBackend::Sqlite => BoxCacheStore::new(SqliteCacheStore::new(pool.clone())),
    }
}

/// Periodically drop expired cache entries until `shutdown` is cancelled.
pub fn spawn_purge_task(
    store: BoxCacheStore,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("cache purge task stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::debug!(removed, "purged expired cache entries"),
                        Err(e) => tracing::warn!(error = %e, "cache purge failed"),
                    }
                }
            }
        }
    })
}
