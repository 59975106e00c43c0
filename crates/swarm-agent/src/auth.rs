//! Credentials and endpoint resolution
//!
//! The API key is read from the environment variable named in
//! [`ModelConfig::api_key_env`]; the base URL may be overridden through
//! [`ModelConfig::base_url_env`] to point at a proxy or self-hosted endpoint.

use std::env;
use swarm_core::config::ModelConfig;
use swarm_core::{Result, SwarmError};

/// Get the API key for the configured endpoint
///
/// Fails fast when the variable is unset or blank so that no pipeline work
/// starts without a usable credential.
pub fn get_api_key(config: &ModelConfig) -> Result<String> {
    match env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", config.api_key_env);
            Ok(key)
        }
        _ => Err(SwarmError::Auth(format!(
            "{} is not set. Export it or add it to a .env file.",
            config.api_key_env
        ))),
    }
}

/// Resolve the endpoint base URL (without trailing slash)
pub fn resolve_base_url(config: &ModelConfig) -> String {
    let base = env::var(&config.base_url_env)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| config.default_base_url.clone());
    base.trim_end_matches('/').to_string()
}
