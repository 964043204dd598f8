//! Composition of the webhook guard.
//!
//! Order of checks: rate limit, signature, workflow lookup, active flag,
//! payload decoding. The workflow is read once per request, before the
//! signature check, and serves both as the secret source and as the result;
//! a missing workflow is only reported once the signature has passed.

use std::sync::Arc;
use std::time::Duration;

use hookgate_types::config::WebhookSettings;
use hookgate_types::webhook::RATE_LIMIT_WINDOW_SECS;
use hookgate_types::workflow::WorkflowDefinition;
use secrecy::SecretString;
use serde_json::{Value, json};

use crate::repository::WorkflowRepository;
use crate::store::BoxCacheStore;

use super::{
    RateLimitDecision, RateLimiter, SecretResolver, SignatureCheck, SignatureVerifier,
    WebhookError,
};

/// One incoming webhook request, as seen by the guard.
#[derive(Debug, Clone, Copy)]
pub struct IngressRequest<'a> {
    pub webhook_id: &'a str,
    pub client_ip: &'a str,
    /// Value of the first signature header present, if any.
    pub signature: Option<&'a str>,
    /// Raw body bytes, exactly as received.
    pub body: &'a [u8],
}

/// A request that passed every check.
#[derive(Debug, Clone)]
pub struct AdmittedWebhook {
    pub workflow: WorkflowDefinition,
    pub payload: Value,
    pub signature: SignatureCheck,
    pub rate_limit: RateLimitDecision,
}

pub struct WebhookIngress<R: WorkflowRepository> {
    repo: Arc<R>,
    limiter: RateLimiter,
    secrets: SecretResolver,
    verifier: SignatureVerifier,
}

impl<R: WorkflowRepository> WebhookIngress<R> {
    pub fn new(
        repo: Arc<R>,
        store: BoxCacheStore,
        settings: &WebhookSettings,
        global_secret: Option<SecretString>,
    ) -> Self {
        let limiter = RateLimiter::new(
            store.clone(),
            settings.rate_limit_per_minute,
            Duration::from_secs(RATE_LIMIT_WINDOW_SECS),
        );
        let secrets = SecretResolver::new(
            store,
            global_secret,
            Duration::from_secs(settings.secret_cache_ttl_secs),
        );
        let verifier = SignatureVerifier::new(settings.signature_required);

        if !settings.signature_required {
            tracing::warn!("webhook signature verification is disabled");
        }

        Self {
            repo,
            limiter,
            secrets,
            verifier,
        }
    }

    pub fn secrets(&self) -> &SecretResolver {
        &self.secrets
    }

    /// Run every guard check against a request.
    pub async fn admit(&self, req: IngressRequest<'_>) -> Result<AdmittedWebhook, WebhookError> {
        let rate_limit = self.limiter.check(req.webhook_id, req.client_ip).await?;
        if let RateLimitDecision::Rejected { limit, retry_after } = rate_limit {
            return Err(WebhookError::RateLimited {
                webhook_id: req.webhook_id.to_string(),
                limit,
                retry_after,
            });
        }

        let workflow = self.repo.find_by_webhook(req.webhook_id).await?;

        // The secret is only needed when there is something to verify.
        let secret = match req.signature {
            Some(_) => {
                self.secrets
                    .resolve(req.webhook_id, workflow.as_ref())
                    .await?
            }
            None => None,
        };
        let signature =
            self.verifier
                .check(req.webhook_id, req.body, req.signature, secret.as_ref())?;

        let workflow =
            workflow.ok_or_else(|| WebhookError::WebhookNotFound(req.webhook_id.to_string()))?;

        if !workflow.is_active {
            return Err(WebhookError::WorkflowInactive(workflow.name.clone()));
        }

        let payload = decode_payload(req.body);

        tracing::info!(
            webhook_id = req.webhook_id,
            workflow_id = %workflow.id,
            client_ip = req.client_ip,
            verified = signature == SignatureCheck::Verified,
            "webhook admitted"
        );

        Ok(AdmittedWebhook {
            workflow,
            payload,
            signature,
            rate_limit,
        })
    }
}

/// Decode a webhook body into a trigger payload.
///
/// Empty bodies become `{}`, JSON is parsed, anything else is wrapped as
/// `{"raw": "<lossy utf-8>"}`.
pub fn decode_payload(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(_) => json!({ "raw": String::from_utf8_lossy(body) }),
    }
}
