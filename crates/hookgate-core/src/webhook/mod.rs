//! Webhook ingress guard.
//!
//! Every incoming webhook passes through [`ingress::WebhookIngress`], which
//! composes the rate limiter, the secret resolver and the signature verifier
//! before handing the decoded payload to the workflow layer.

pub mod ingress;
pub mod rate_limit;
pub mod secret;
pub mod signature;

pub use ingress::{AdmittedWebhook, IngressRequest, WebhookIngress};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use secret::SecretResolver;
pub use signature::{SignatureCheck, SignatureVerifier, compute_signature, verify_signature};

use std::time::Duration;

use hookgate_types::error::{RepositoryError, StoreError};

/// Reasons a webhook request is refused.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("too many requests for webhook '{webhook_id}'")]
    RateLimited {
        webhook_id: String,
        limit: u32,
        retry_after: Duration,
    },

    #[error("missing webhook signature")]
    MissingSignature,

    #[error("no secret configured for webhook '{0}'")]
    SecretUnavailable(String),

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("invalid HMAC key: {0}")]
    InvalidKey(String),

    #[error("webhook not found: {0}")]
    WebhookNotFound(String),

    #[error("workflow '{0}' is not active")]
    WorkflowInactive(String),

    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}
