//! BoxCacheStore -- object-safe dynamic dispatch wrapper for CacheStore.
//!
//! 1. `CacheStoreDyn` is an object-safe mirror of `CacheStore` with boxed futures
//! 2. Blanket-impl `CacheStoreDyn` for all `T: CacheStore`
//! 3. `BoxCacheStore` wraps `Arc<dyn CacheStoreDyn>` and implements `CacheStore` again
//!
//! This lets the backend be chosen at runtime from configuration.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use hookgate_types::error::StoreError;

use super::{CacheStore, CounterState};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`CacheStore`] with boxed futures.
pub trait CacheStoreDyn: Send + Sync {
    fn get_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    fn set_boxed<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    fn increment_boxed<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
    ) -> BoxFuture<'a, Result<CounterState, StoreError>>;

    fn delete_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>>;

    fn purge_expired_boxed(&self) -> BoxFuture<'_, Result<u64, StoreError>>;
}

impl<T: CacheStore> CacheStoreDyn for T {
    fn get_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(self.get(key))
    }

    fn set_boxed<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.set(key, value, ttl))
    }

    fn increment_boxed<'a>(
        &'a self,
        key: &'a str,
        window: Duration,
    ) -> BoxFuture<'a, Result<CounterState, StoreError>> {
        Box::pin(self.increment(key, window))
    }

    fn delete_boxed<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(self.delete(key))
    }

    fn purge_expired_boxed(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(self.purge_expired())
    }
}

/// Type-erased cache store shared by the secret resolver and the rate limiter.
///
/// Cloning is cheap (one `Arc`).
#[derive(Clone)]
pub struct BoxCacheStore {
    inner: Arc<dyn CacheStoreDyn>,
}

impl BoxCacheStore {
    pub fn new<T: CacheStore + 'static>(store: T) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl CacheStore for BoxCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_boxed(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.inner.set_boxed(key, value, ttl).await
    }

    async fn increment(&self, key: &str, window: Duration) -> Result<CounterState, StoreError> {
        self.inner.increment_boxed(key, window).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_boxed(key).await
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.inner.purge_expired_boxed().await
    }
}
