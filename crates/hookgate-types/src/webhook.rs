//! Webhook wire constants shared by the guard, the HTTP layer and the CLI.

/// Signature headers accepted on incoming webhooks, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 3] = [
    "x-webhook-signature",
    "x-hub-signature-256",
    "x-signature",
];

/// Prefix of every signature header value (`sha256=<hex>`).
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Default maximum number of webhook requests per client per minute.
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;

/// Default lifetime of a cached per-workflow secret (1 hour).
pub const DEFAULT_SECRET_CACHE_TTL_SECS: u64 = 3600;

/// Length of a rate-limit window in seconds.
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
