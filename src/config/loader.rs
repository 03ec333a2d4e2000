//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::{AppConfig, Secret};
use crate::config::validation::{validate_config, ValidationError};

pub const ENV_RPC_URL: &str = "ESTATE_RPC_URL";
pub const ENV_PRIVATE_KEY: &str = "ESTATE_PRIVATE_KEY";
pub const ENV_REGISTRY_ADDRESS: &str = "ESTATE_REGISTRY_ADDRESS";
pub const ENV_PIN_JWT: &str = "ESTATE_PIN_JWT";
pub const ENV_DATABASE_URL: &str = "ESTATE_DATABASE_URL";
pub const ENV_JWT_SECRET: &str = "ESTATE_JWT_SECRET";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, overlay the environment, and validate.
///
/// The file is optional; without one every value comes from defaults and the
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => AppConfig::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok());

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment-provided values; empty variables are ignored.
pub fn apply_env<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_RPC_URL) {
        config.ledger.rpc_url = url;
    }
    if let Some(key) = get(ENV_PRIVATE_KEY) {
        config.ledger.private_key = Secret::new(key);
    }
    if let Some(address) = get(ENV_REGISTRY_ADDRESS) {
        config.ledger.registry_address = address;
    }
    if let Some(jwt) = get(ENV_PIN_JWT) {
        config.pinning.jwt = Secret::new(jwt);
    }
    if let Some(url) = get(ENV_DATABASE_URL) {
        config.database.url = Secret::new(url);
    }
    if let Some(secret) = get(ENV_JWT_SECRET) {
        config.auth.jwt_secret = Secret::new(secret);
    }
}
