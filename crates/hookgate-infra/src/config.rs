//! Gateway configuration loader for hookgate.
//!
//! Reads `config.toml` from the data directory (`~/.hookgate/` in production)
//! or an explicit path, and deserializes it into [`GatewayConfig`]. Falls back
//! to defaults when the file is missing or malformed, then applies
//! `HOOKGATE_*` environment overrides.

use std::path::{Path, PathBuf};

use hookgate_types::config::GatewayConfig;
use secrecy::SecretString;

/// Environment variable that relocates the data directory.
pub const DATA_DIR_ENV: &str = "HOOKGATE_DATA_DIR";

/// Config file name inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `HOOKGATE_DATA_DIR` environment variable
/// 2. `~/.hookgate`
/// 3. `./.hookgate`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".hookgate");
    }

    PathBuf::from(".hookgate")
}

/// Load configuration from a TOML file.
///
/// - If the file does not exist, returns [`GatewayConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_config_file(config_path: &Path) -> GatewayConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config file found at {}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return GatewayConfig::default();
        }
    };

    match toml::from_str::<GatewayConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            GatewayConfig::default()
        }
    }
}

/// Load `{data_dir}/config.toml` (or `explicit_path`) and apply environment overrides.
pub async fn load_gateway_config(data_dir: &Path, explicit_path: Option<&Path>) -> GatewayConfig {
    let path = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE));
    let mut config = load_config_file(&path).await;
    apply_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Apply `HOOKGATE_*` overrides using `lookup` to read variables.
///
/// | variable                          | field                              |
/// |-----------------------------------|------------------------------------|
/// | `HOOKGATE_WEBHOOK_SECRET`         | `webhooks.global_secret`           |
/// | `HOOKGATE_SIGNATURE_REQUIRED`     | `webhooks.signature_required`      |
/// | `HOOKGATE_RATE_LIMIT_PER_MINUTE`  | `webhooks.rate_limit_per_minute`   |
/// | `HOOKGATE_DEBUG`                  | `debug`                            |
///
/// Unparseable values are ignored with a warning.
pub fn apply_overrides(config: &mut GatewayConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(secret) = lookup("HOOKGATE_WEBHOOK_SECRET") {
        config.webhooks.global_secret = Some(secret).filter(|s| !s.is_empty());
    }

    if let Some(raw) = lookup("HOOKGATE_SIGNATURE_REQUIRED") {
        match parse_bool(&raw) {
            Some(v) => config.webhooks.signature_required = v,
            None => tracing::warn!(value = %raw, "ignoring invalid HOOKGATE_SIGNATURE_REQUIRED"),
        }
    }

    if let Some(raw) = lookup("HOOKGATE_RATE_LIMIT_PER_MINUTE") {
        match raw.trim().parse::<u32>() {
            Ok(v) => config.webhooks.rate_limit_per_minute = v,
            Err(_) => tracing::warn!(value = %raw, "ignoring invalid HOOKGATE_RATE_LIMIT_PER_MINUTE"),
        }
    }

    if let Some(raw) = lookup("HOOKGATE_DEBUG") {
        match parse_bool(&raw) {
            Some(v) => config.debug = v,
            None => tracing::warn!(value = %raw, "ignoring invalid HOOKGATE_DEBUG"),
        }
    }
}

/// The configured global webhook secret, wrapped so it is never logged.
pub fn global_secret(config: &GatewayConfig) -> Option<SecretString> {
    config
        .webhooks
        .global_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| SecretString::from(s.to_string()))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookgate_types::config::StoreBackend;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(&tmp.path().join(CONFIG_FILE)).await;
        assert!(config.webhooks.signature_required);
        assert_eq!(config.webhooks.rate_limit_per_minute, 60);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        tokio::fs::write(
            &path,
            r#"
[webhooks]
global_secret = "from-file"
rate_limit_per_minute = 10

[store]
backend = "sqlite"
purge_interval_secs = 30
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(&path).await;
        assert_eq!(config.webhooks.global_secret.as_deref(), Some("from-file"));
        assert_eq!(config.webhooks.rate_limit_per_minute, 10);
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.purge_interval_secs, 30);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        tokio::fs::write(&path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(&path).await;
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert!(config.webhooks.global_secret.is_none());
    }

    #[tokio::test]
    async fn load_gateway_config_prefers_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let explicit = tmp.path().join("custom.toml");
        tokio::fs::write(&explicit, "[server]\nport = 9999\n")
            .await
            .unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "[server]\nport = 1111\n")
            .await
            .unwrap();

        let config = load_gateway_config(tmp.path(), Some(&explicit)).await;
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn overrides_apply() {
        let mut config = GatewayConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("HOOKGATE_WEBHOOK_SECRET", "env-secret"),
                ("HOOKGATE_SIGNATURE_REQUIRED", "false"),
                ("HOOKGATE_RATE_LIMIT_PER_MINUTE", "5"),
                ("HOOKGATE_DEBUG", "1"),
            ]),
        );
        assert_eq!(config.webhooks.global_secret.as_deref(), Some("env-secret"));
        assert!(!config.webhooks.signature_required);
        assert_eq!(config.webhooks.rate_limit_per_minute, 5);
        assert!(config.debug);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut config = GatewayConfig::default();
        apply_overrides(
            &mut config,
            env(&[
                ("HOOKGATE_SIGNATURE_REQUIRED", "maybe"),
                ("HOOKGATE_RATE_LIMIT_PER_MINUTE", "-3"),
            ]),
        );
        assert!(config.webhooks.signature_required);
        assert_eq!(config.webhooks.rate_limit_per_minute, 60);
    }

    #[test]
    fn global_secret_ignores_empty() {
        let mut config = GatewayConfig::default();
        assert!(global_secret(&config).is_none());

        config.webhooks.global_secret = Some(String::new());
        assert!(global_secret(&config).is_none());

        config.webhooks.global_secret = Some("shh".to_string());
        assert_eq!(global_secret(&config).unwrap().expose_secret(), "shh");
    }
}
