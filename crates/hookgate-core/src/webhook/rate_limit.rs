//! Fixed-window rate limiting per (webhook, client IP).
//!
//! The counter lives in the cache store and expires with its window, so no
//! reset logic is needed here. The counter is incremented before comparing,
//! which keeps the number of admitted requests within the limit even when
//! requests race.

use std::time::Duration;

use hookgate_types::error::StoreError;

use crate::store::{BoxCacheStore, CacheStore};

/// Cache key for a (webhook, IP) counter.
pub fn rate_limit_key(webhook_id: &str, client_ip: &str) -> String {
    format!("rate_limit:webhook:{webhook_id}:{client_ip}")
}

/// Result of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Limiting is disabled (`rate_limit_per_minute = 0`).
    Unlimited,
    Allowed {
        limit: u32,
        remaining: u32,
        /// Time until the current window resets.
        reset_after: Duration,
    },
    Rejected {
        limit: u32,
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, RateLimitDecision::Rejected { .. })
    }
}

pub struct RateLimiter {
    store: BoxCacheStore,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: BoxCacheStore, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count this request and decide whether it may proceed.
    pub async fn check(
        &self,
        webhook_id: &str,
        client_ip: &str,
    ) -> Result<RateLimitDecision, StoreError> {
        if self.max_requests == 0 {
            return Ok(RateLimitDecision::Unlimited);
        }

        let key = rate_limit_key(webhook_id, client_ip);
        let state = self.store.increment(&key, self.window).await?;
        let limit = self.max_requests;

        if state.count > u64::from(limit) {
            tracing::warn!(
                webhook_id,
                client_ip,
                count = state.count,
                limit,
                "webhook rate limit exceeded"
            );
            return Ok(RateLimitDecision::Rejected {
                limit,
                retry_after: state.ttl,
            });
        }

        Ok(RateLimitDecision::Allowed {
            limit,
            remaining: limit - state.count as u32,
            reset_after: state.ttl,
        })
    }
}
