//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.wagate/config.json`) and environment.
//! Environment variables override the file; CLI flags override both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Inbound message relay target.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Session adapter (sidecar) settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port (default 4000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    4000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Webhook relay config. No URL means inbound messages are not forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Endpoint receiving one POST per inbound message. Overridden by WEBHOOK_URL env.
    pub url: Option<String>,

    /// Timeout for the outbound POST, in seconds (default 10).
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

/// Sidecar connection and lifecycle timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// WebSocket URL of the browser-automation sidecar. Overridden by SIDECAR_URL env.
    #[serde(default = "default_sidecar_url")]
    pub sidecar_url: String,

    /// Delay between a disconnect request and re-initialization, in milliseconds (default 3000).
    #[serde(default = "default_reinit_delay_ms")]
    pub reinit_delay_ms: u64,

    /// How long a sidecar request waits for its reply, in seconds (default 30).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_sidecar_url() -> String {
    "ws://127.0.0.1:4100".to_string()
}

fn default_reinit_delay_ms() -> u64 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sidecar_url: default_sidecar_url(),
            reinit_delay_ms: default_reinit_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl SessionConfig {
    pub fn reinit_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Read an env var, trimmed; empty counts as unset.
fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve the webhook URL: env WEBHOOK_URL overrides config.
pub fn resolve_webhook_url(config: &Config) -> Option<String> {
    env_nonempty("WEBHOOK_URL").or_else(|| {
        config
            .webhook
            .url
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// Resolve the listening port: env PORT overrides config. An unparsable PORT is ignored with a warning.
pub fn resolve_port(config: &Config) -> u16 {
    match env_nonempty("PORT") {
        Some(p) => match p.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                log::warn!("ignoring invalid PORT value: {}", p);
                config.gateway.port
            }
        },
        None => config.gateway.port,
    }
}

/// Resolve the sidecar URL: env SIDECAR_URL overrides config.
pub fn resolve_sidecar_url(config: &Config) -> String {
    env_nonempty("SIDECAR_URL").unwrap_or_else(|| config.session.sidecar_url.trim().to_string())
}

/// Fold environment overrides into the config so the rest of the program reads a single source.
pub fn apply_env_overrides(mut config: Config) -> Config {
    config.gateway.port = resolve_port(&config);
    config.webhook.url = resolve_webhook_url(&config);
    config.session.sidecar_url = resolve_sidecar_url(&config);
    config
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WAGATE_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".wagate").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
