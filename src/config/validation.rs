//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::blockchain::types::WalletAddress;
use crate::config::loader::{
    ENV_DATABASE_URL, ENV_JWT_SECRET, ENV_PIN_JWT, ENV_PRIVATE_KEY, ENV_REGISTRY_ADDRESS,
};
use crate::config::schema::AppConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required (set {env})")]
    Missing { field: &'static str, env: &'static str },
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let required = [
        ("ledger.private_key", ENV_PRIVATE_KEY, config.ledger.private_key.is_empty()),
        ("ledger.registry_address", ENV_REGISTRY_ADDRESS, config.ledger.registry_address.trim().is_empty()),
        ("pinning.jwt", ENV_PIN_JWT, config.pinning.jwt.is_empty()),
        ("database.url", ENV_DATABASE_URL, config.database.url.is_empty()),
        ("auth.jwt_secret", ENV_JWT_SECRET, config.auth.jwt_secret.is_empty()),
    ];
    for (field, env, missing) in required {
        if missing {
            errors.push(ValidationError::Missing { field, env });
        }
    }

    if !config.ledger.registry_address.trim().is_empty()
        && config.ledger.registry_address.parse::<WalletAddress>().is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "ledger.registry_address",
            reason: "not a 20-byte hex address".to_string(),
        });
    }

    match Url::parse(&config.ledger.rpc_url) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => {}
        Ok(_) => errors.push(ValidationError::Invalid {
            field: "ledger.rpc_url",
            reason: "event subscriptions need a ws:// or wss:// endpoint".to_string(),
        }),
        Err(e) => errors.push(ValidationError::Invalid {
            field: "ledger.rpc_url",
            reason: e.to_string(),
        }),
    }

    let http_urls = [
        ("pinning.api_url", &config.pinning.api_url),
        ("pinning.gateway_url", &config.pinning.gateway_url),
    ];
    for (field, raw) in http_urls {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::Invalid {
                field,
                reason: format!("'{}' is not an http(s) URL", raw),
            }),
        }
    }

    for wallet in &config.auth.admin_wallets {
        if wallet.parse::<WalletAddress>().is_err() {
            errors.push(ValidationError::Invalid {
                field: "auth.admin_wallets",
                reason: format!("'{}' is not a wallet address", wallet),
            });
        }
    }

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Invalid {
            field: "server.bind_address",
            reason: format!("'{}' is not a socket address", config.server.bind_address),
        });
    }

    let positive = [
        ("server.request_timeout_secs", config.server.request_timeout_secs),
        ("ledger.rpc_timeout_secs", config.ledger.rpc_timeout_secs),
        ("ledger.receipt_poll_interval_ms", config.ledger.receipt_poll_interval_ms),
        ("ledger.mining_timeout_secs", config.ledger.mining_timeout_secs),
        ("pinning.upload_timeout_secs", config.pinning.upload_timeout_secs),
        ("auth.token_ttl_secs", config.auth.token_ttl_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Invalid {
                field,
                reason: "must be greater than zero".to_string(),
            });
        }
    }

    if config.server.max_file_upload_bytes == 0 || config.server.max_property_upload_bytes == 0 {
        errors.push(ValidationError::Invalid {
            field: "server.max_*_upload_bytes",
            reason: "upload caps must be greater than zero".to_string(),
        });
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::Invalid {
            field: "observability.log_format",
            reason: format!("unknown format '{}'", config.observability.log_format),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::Invalid {
            field: "observability.metrics_address",
            reason: format!("'{}' is not a socket address", config.observability.metrics_address),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
