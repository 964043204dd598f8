//! `hookgate sign`: compute the signature header for a payload, for testing
//! senders and replaying deliveries.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tokio::io::AsyncReadExt;

use hookgate_core::webhook::compute_signature;
use hookgate_types::webhook::SIGNATURE_HEADERS;

pub async fn sign_payload(secret: &str, file: Option<&Path>, json: bool) -> Result<()> {
    if secret.is_empty() {
        anyhow::bail!("secret must not be empty");
    }

    let body = match file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("Failed to read payload from stdin")?;
            buf
        }
    };

    let signature = compute_signature(secret.as_bytes(), &body)?;
    let header = SIGNATURE_HEADERS[0];

    if json {
        let out = serde_json::json!({
            "header": header,
            "signature": signature,
            "bytes": body.len(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}: {}", style(header).dim(), signature);
    }

    Ok(())
}
