//! Webhook secret resolution.
//!
//! A workflow-specific secret wins over the global fallback. Workflow secrets
//! are memoized in the cache store under `webhook_secret:<webhook_id>`,
//! stamped with the revision (id and `updated_at`) of the workflow they were
//! read from. A cached secret is only served while the caller's copy of the
//! workflow carries the same revision, so a re-imported workflow takes effect
//! on the next request in every process, whatever cache backend each uses.

use std::time::Duration;

use hookgate_types::workflow::WorkflowDefinition;
use secrecy::{ExposeSecret, SecretString};

use crate::store::{BoxCacheStore, CacheStore};

use super::WebhookError;

/// Cache key for a webhook's resolved secret.
pub fn secret_cache_key(webhook_id: &str) -> String {
    format!("webhook_secret:{webhook_id}")
}

/// `<workflow id>@<updated_at in microseconds>`; never contains `:`.
fn revision(workflow: &WorkflowDefinition) -> String {
    format!("{}@{}", workflow.id, workflow.updated_at.timestamp_micros())
}

/// Resolves the HMAC secret for a webhook.
pub struct SecretResolver {
    store: BoxCacheStore,
    global_secret: Option<SecretString>,
    ttl: Duration,
}

impl SecretResolver {
    /// Empty global secrets are treated as absent.
    pub fn new(store: BoxCacheStore, global_secret: Option<SecretString>, ttl: Duration) -> Self {
        let global_secret = global_secret.filter(|s| !s.expose_secret().is_empty());
        Self {
            store,
            global_secret,
            ttl,
        }
    }

    /// Secret for `webhook_id`, given the workflow currently bound to it.
    ///
    /// Returns the workflow secret (cached per revision) or the global
    /// secret; `None` if neither exists.
    pub async fn resolve(
        &self,
        webhook_id: &str,
        workflow: Option<&WorkflowDefinition>,
    ) -> Result<Option<SecretString>, WebhookError> {
        let Some(workflow) = workflow else {
            return Ok(self.global());
        };
        let key = secret_cache_key(webhook_id);
        let current = revision(workflow);

        if let Some(cached) = self.store.get(&key).await? {
            match cached.split_once(':') {
                Some((stamp, secret)) if stamp == current && !secret.is_empty() => {
                    tracing::trace!(webhook_id, "webhook secret served from cache");
                    return Ok(Some(SecretString::from(secret.to_string())));
                }
                _ => tracing::debug!(webhook_id, "cached webhook secret is stale"),
            }
        }

        match workflow.webhook_secret() {
            Some(secret) => {
                self.store
                    .set(&key, &format!("{current}:{secret}"), Some(self.ttl))
                    .await?;
                tracing::debug!(webhook_id, ttl_secs = self.ttl.as_secs(), "cached webhook secret");
                Ok(Some(SecretString::from(secret.to_string())))
            }
            None => Ok(self.global()),
        }
    }

    /// Drop a cached secret.
    pub async fn forget(&self, webhook_id: &str) -> Result<(), WebhookError> {
        self.store.delete(&secret_cache_key(webhook_id)).await?;
        Ok(())
    }

    fn global(&self) -> Option<SecretString> {
        self.global_secret
            .as_ref()
            .map(|s| SecretString::from(s.expose_secret().to_string()))
    }
}
