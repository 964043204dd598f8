//! Gateway configuration types for hookgate.
//!
//! `GatewayConfig` represents the top-level `config.toml` that controls the
//! HTTP listener, the webhook guard policy, the cache store backend and the
//! canvas engine limits. Every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::webhook::{DEFAULT_RATE_LIMIT_PER_MINUTE, DEFAULT_SECRET_CACHE_TTL_SECS};

/// Top-level configuration for the hookgate service.
///
/// Loaded from `~/.hookgate/config.toml` (or `--config`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Expose underlying error text in HTTP error envelopes.
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub webhooks: WebhookSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub engine: EngineSettings,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Take the client IP from the first `X-Forwarded-For` entry.
    /// Only enable behind a proxy that sets the header.
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            trust_forwarded_for: false,
        }
    }
}

/// Webhook guard policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSettings {
    /// Reject unsigned requests. Disable only for local development.
    #[serde(default = "default_signature_required")]
    pub signature_required: bool,

    /// Fallback secret used when a workflow has no secret of its own.
    #[serde(default, skip_serializing)]
    pub global_secret: Option<String>,

    /// Maximum requests per (webhook, client IP) per minute. `0` disables the limit.
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    /// How long a resolved per-workflow secret stays cached.
    #[serde(default = "default_secret_cache_ttl")]
    pub secret_cache_ttl_secs: u64,
}

fn default_signature_required() -> bool {
    true
}

fn default_rate_limit() -> u32 {
    DEFAULT_RATE_LIMIT_PER_MINUTE
}

fn default_secret_cache_ttl() -> u64 {
    DEFAULT_SECRET_CACHE_TTL_SECS
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            signature_required: default_signature_required(),
            global_secret: None,
            rate_limit_per_minute: default_rate_limit(),
            secret_cache_ttl_secs: default_secret_cache_ttl(),
        }
    }
}

/// Which cache store backend holds secrets and rate-limit counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

/// Cache store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Interval between sweeps of expired cache entries.
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_purge_interval() -> u64 {
    60
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

/// Canvas engine limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Upper bound for a whole workflow run.
    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Upper bound for a single `delay` node.
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

fn default_engine_timeout() -> u64 {
    300
}

fn default_max_delay() -> u64 {
    60
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_engine_timeout(),
            max_delay_secs: default_max_delay(),
        }
    }
}
