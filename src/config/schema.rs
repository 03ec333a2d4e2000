//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the coordinator.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::blockchain::nonce::NonceMode;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener and request limits.
    pub server: ServerConfig,

    /// Ledger RPC and signer.
    pub ledger: LedgerConfig,

    /// Pin service endpoints and credentials.
    pub pinning: PinningConfig,

    /// Mirror store connection.
    pub database: DatabaseConfig,

    /// Session token settings.
    pub auth: AuthConfig,

    /// Event subscriber settings.
    pub ingestor: IngestorConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A credential that never appears in `Debug` output or serialized config.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Secret(<unset>)")
        } else {
            f.write_str("Secret(<redacted>)")
        }
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Secret)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Whole-request timeout in seconds. Mining waits run inside this.
    pub request_timeout_secs: u64,

    /// Grace period for in-flight requests after a shutdown signal.
    pub shutdown_grace_secs: u64,

    /// Body cap for multipart property creation and upload requests.
    pub max_property_upload_bytes: usize,

    /// Body cap for the standalone /upload endpoint.
    pub max_file_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 180,
            shutdown_grace_secs: 5,
            max_property_upload_bytes: 20 * 1024 * 1024,
            max_file_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Ledger integration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// RPC endpoint; must be WebSocket for event subscriptions.
    pub rpc_url: String,

    /// Platform-registry contract address.
    pub registry_address: String,

    /// Hex signing key.
    pub private_key: Secret,

    /// Expected chain id; when set, a mismatching RPC aborts startup.
    pub chain_id: Option<u64>,

    /// RPC request timeout in seconds.
    pub rpc_timeout_secs: u64,

    /// Receipt polling interval while waiting for mining.
    pub receipt_poll_interval_ms: u64,

    /// Upper bound on any single mining wait.
    pub mining_timeout_secs: u64,

    /// Nonce strategy for writes.
    pub nonce_mode: NonceMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "ws://127.0.0.1:8545".to_string(),
            registry_address: String::new(),
            private_key: Secret::default(),
            chain_id: None,
            rpc_timeout_secs: 10,
            receipt_poll_interval_ms: 1000,
            mining_timeout_secs: 120,
            nonce_mode: NonceMode::Rpc,
        }
    }
}

/// Pin service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PinningConfig {
    /// File pinning endpoint.
    pub api_url: String,

    /// Public gateway base; the CID is appended.
    pub gateway_url: String,

    /// Bearer token for the pin service.
    pub jwt: Secret,

    /// Wall-clock cap per upload.
    pub upload_timeout_secs: u64,
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            gateway_url: "https://gateway.pinata.cloud/ipfs/".to_string(),
            jwt: Secret::default(),
            upload_timeout_secs: 120,
        }
    }
}

/// Mirror store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection string.
    pub url: Secret,

    /// Pool size.
    pub max_connections: u32,

    /// Apply embedded migrations on startup.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: Secret::default(),
            max_connections: 10,
            run_migrations: true,
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens.
    pub jwt_secret: Secret,

    /// Token lifetime.
    pub token_ttl_secs: u64,

    /// Wallets that register with the admin role.
    pub admin_wallets: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Secret::default(),
            token_ttl_secs: 24 * 3600,
            admin_wallets: Vec::new(),
        }
    }
}

/// Event subscriber configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IngestorConfig {
    /// Run the two subscribers.
    pub enabled: bool,

    /// Wait before resubscribing after a dropped subscription.
    pub resubscribe_delay_ms: u64,

    /// Cap for the growing delay after repeated failures.
    pub max_resubscribe_delay_ms: u64,

    /// Consecutive failed resubscribes before the subscriber gives up (0 = never).
    pub max_consecutive_failures: u32,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resubscribe_delay_ms: 5000,
            max_resubscribe_delay_ms: 60_000,
            max_consecutive_failures: 0,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_follow_service_limits() {
        let config = AppConfig::default();
        assert_eq!(config.server.max_property_upload_bytes, 20 * 1024 * 1024);
        assert_eq!(config.server.max_file_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.server.shutdown_grace_secs, 5);
        assert_eq!(config.pinning.upload_timeout_secs, 120);
        assert_eq!(config.ingestor.resubscribe_delay_ms, 5000);
        assert!(config.ledger.rpc_url.starts_with("ws://"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [ledger]
            registry_address = "0x0000000000000000000000000000000000000abc"
            nonce_mode = "local"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.ledger.nonce_mode, NonceMode::Local);
        assert_eq!(config.ledger.rpc_timeout_secs, 10);
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.server.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_secret_is_redacted() {
        let secret = Secret::new("super-secret");
        assert_eq!(format!("{:?}", secret), "Secret(<redacted>)");
        assert_eq!(secret.expose(), "super-secret");
        assert_eq!(serde_json::to_string(&secret).unwrap(), "\"\"");
    }
}
