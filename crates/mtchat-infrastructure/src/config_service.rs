//! Resolves the effective `ClientConfig`.
//!
//! Priority: environment variables > config.toml > built-in defaults.

use std::path::PathBuf;

use mtchat_core::Result;
use mtchat_core::config::{ClientConfig, Environment};

use crate::storage::ConfigStorage;

/// Environment variables consulted, with their fallbacks.
const API_URL_VARS: [&str; 3] = ["MTCHAT_API_URL", "API_BASE_URL", "NEXT_PUBLIC_API_URL"];
const CHAT_URL_VARS: [&str; 2] = ["MTCHAT_CHAT_URL", "BASE_CHAT_URL"];
const PUBLIC_URL_VARS: [&str; 2] = ["MTCHAT_PUBLIC_URL", "PUBLIC_BASE_URL"];
const TENANT_VARS: [&str; 1] = ["MTCHAT_TENANT"];
const ENV_VARS: [&str; 2] = ["MTCHAT_ENV", "NODE_ENV"];
const TIMEOUT_VARS: [&str; 1] = ["MTCHAT_REQUEST_TIMEOUT_SECS"];

fn first_set(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
}

/// Applies environment overrides using `lookup` as the variable source.
pub fn apply_env_overrides(
    mut config: ClientConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ClientConfig {
    if let Some(url) = first_set(&lookup, &API_URL_VARS) {
        config.api_base_url = url;
    }
    if let Some(url) = first_set(&lookup, &CHAT_URL_VARS) {
        config.chat_base_url = url;
    }
    if let Some(url) = first_set(&lookup, &PUBLIC_URL_VARS) {
        config.public_url = Some(url);
    }
    if let Some(tenant) = first_set(&lookup, &TENANT_VARS) {
        config.tenant_id = tenant;
    }
    if let Some(env) = first_set(&lookup, &ENV_VARS) {
        match env.parse::<Environment>() {
            Ok(env) => config.environment = env,
            Err(_) => tracing::warn!("[Config] Ignoring unknown environment '{}'", env),
        }
    }
    if let Some(secs) = first_set(&lookup, &TIMEOUT_VARS).and_then(|v| v.parse().ok()) {
        config.request_timeout_secs = secs;
    }
    config
}

/// Loads config.toml (from `path`, or the default location) and applies
/// process environment overrides.
pub fn load_config(path: Option<PathBuf>) -> Result<ClientConfig> {
    let storage = match path {
        Some(path) => ConfigStorage::with_path(path),
        None => ConfigStorage::new()?,
    };
    let config = storage.load_or_default()?;
    tracing::debug!("[Config] Loaded base config from {}", storage.path().display());
    Ok(apply_env_overrides(config, |name| std::env::var(name).ok()))
}

/// Writes `config` to `path` (or the default location) and returns where it
/// went.
pub fn write_config(path: Option<PathBuf>, config: &ClientConfig) -> Result<PathBuf> {
    let storage = match path {
        Some(path) => ConfigStorage::with_path(path),
        None => ConfigStorage::new()?,
    };
    storage.save(config)?;
    tracing::info!("[Config] Wrote {}", storage.path().display());
    Ok(storage.path().to_path_buf())
}
