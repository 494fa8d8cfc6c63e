//! Server configuration.
//!
//! Loading flow: start from compiled defaults, deep-merge a JSON settings
//! file over them if one exists, then apply `MISE_*` environment variable
//! overrides (highest priority). Invalid env values are silently ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Configuration for the mise server.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Path of the `SQLite` event database; in-memory when absent.
    pub database_path: Option<String>,
    /// Interval between protocol-level ping frames, in seconds.
    pub heartbeat_interval_secs: u64,
    /// How long a client may stay silent before being disconnected, in
    /// seconds.
    pub heartbeat_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            database_path: None,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
        }
    }
}

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON, or does not match the schema.
    #[error("invalid settings: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Load configuration from an optional settings file plus env overrides.
pub fn load_config(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    let defaults = serde_json::to_value(ServerConfig::default())?;

    let merged = match path {
        Some(path) if path.exists() => {
            debug!(?path, "loading settings from file");
            let content = std::fs::read_to_string(path)?;
            let user: Value = serde_json::from_str(&content)?;
            deep_merge(defaults, user)
        }
        Some(path) => {
            debug!(?path, "settings file not found, using defaults");
            defaults
        }
        None => defaults,
    };

    let mut config: ServerConfig = serde_json::from_value(merged)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge recursively (source overrides target per key); arrays and
/// primitives are replaced entirely; nulls in the source are skipped.
fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn apply_env_overrides(config: &mut ServerConfig) {
    if let Some(v) = read_env_string("MISE_HOST") {
        config.host = v;
    }
    if let Some(v) = read_env_u16("MISE_PORT") {
        config.port = v;
    }
    if let Some(v) = read_env_string("MISE_DATABASE") {
        config.database_path = Some(v);
    }
    if let Some(v) = read_env_u64("MISE_HEARTBEAT_INTERVAL", 1, 3600) {
        config.heartbeat_interval_secs = v;
    }
    if let Some(v) = read_env_u64("MISE_HEARTBEAT_TIMEOUT", 1, 3600) {
        config.heartbeat_timeout_secs = v;
    }
}

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str) -> Option<u16> {
    std::env::var(name).ok()?.parse().ok()
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let value: u64 = std::env::var(name).ok()?.parse().ok()?;
    (min..=max).contains(&value).then_some(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
