//! HMAC-SHA256 webhook signatures.
//!
//! Senders sign the raw request body with a shared secret and send the result
//! as `sha256=<hex>` in one of the `SIGNATURE_HEADERS`.

use hmac::{Hmac, Mac};
use hookgate_types::webhook::SIGNATURE_PREFIX;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Compute the `sha256=<hex>` header value for a body.
pub fn compute_signature(secret: &[u8], body: &[u8]) -> Result<String, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| WebhookError::InvalidKey(e.to_string()))?;
    mac.update(body);
    Ok(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check a `sha256=<hex>` header value against a body.
///
/// Uses the hmac crate's constant-time `verify_slice`. A missing prefix or
/// non-hex digest never matches.
pub fn verify_signature(secret: &[u8], body: &[u8], header: &str) -> bool {
    let Some(digest_hex) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// How a request passed the signature policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Signature present and valid.
    Verified,
    /// No signature and signatures are not required.
    Unsigned,
}

/// Applies the signature policy to one request.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
    signature_required: bool,
}

impl SignatureVerifier {
    pub fn new(signature_required: bool) -> Self {
        Self { signature_required }
    }

    pub fn signature_required(&self) -> bool {
        self.signature_required
    }

    /// Evaluate, in order: missing header (reject if required, else accept
    /// unsigned), missing secret, digest mismatch.
    pub fn check(
        &self,
        webhook_id: &str,
        body: &[u8],
        signature: Option<&str>,
        secret: Option<&SecretString>,
    ) -> Result<SignatureCheck, WebhookError> {
        let Some(signature) = signature else {
            if self.signature_required {
                tracing::warn!(webhook_id, "rejected unsigned webhook request");
                return Err(WebhookError::MissingSignature);
            }
            tracing::warn!(
                webhook_id,
                "accepting unsigned webhook request: signature verification is disabled"
            );
            return Ok(SignatureCheck::Unsigned);
        };

        let Some(secret) = secret else {
            tracing::warn!(webhook_id, "no webhook secret configured, rejecting request");
            return Err(WebhookError::SecretUnavailable(webhook_id.to_string()));
        };

        if verify_signature(secret.expose_secret().as_bytes(), body, signature) {
            Ok(SignatureCheck::Verified)
        } else {
            tracing::warn!(webhook_id, "webhook signature mismatch");
            Err(WebhookError::InvalidSignature)
        }
    }
}
