//! Pinata-compatible pin service client.
//!
//! # Design Decisions
//! - No connection reuse: the service closes pooled connections mid-body,
//!   which surfaces as premature EOF on the next upload
//! - The upload timeout is independent of the caller's request deadline
//! - CIDs are opaque; only emptiness is rejected

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONNECTION};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;

use crate::config::PinningConfig;
use crate::observability::metrics;
use crate::pinning::store::{PinError, PinStore};

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

pub struct PinataClient {
    http: reqwest::Client,
    api_url: String,
    gateway_url: String,
    jwt: String,
    timeout_secs: u64,
}

impl PinataClient {
    pub fn new(config: &PinningConfig) -> Result<Self, PinError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .timeout(Duration::from_secs(config.upload_timeout_secs))
            .build()
            .map_err(|e| PinError::Transport(e.to_string()))?;

        let mut gateway_url = config.gateway_url.clone();
        if !gateway_url.ends_with('/') {
            gateway_url.push('/');
        }

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            gateway_url,
            jwt: config.jwt.expose().to_string(),
            timeout_secs: config.upload_timeout_secs,
        })
    }

    fn classify(&self, err: reqwest::Error) -> PinError {
        if err.is_timeout() {
            PinError::Timeout(self.timeout_secs)
        } else {
            PinError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl PinStore for PinataClient {
    async fn upload(&self, content: Bytes, filename: &str) -> Result<String, PinError> {
        let size = content.len();
        let part = Part::bytes(content.to_vec()).file_name(filename.to_string());
        let form = Form::new().part("file", part);

        let result = self
            .http
            .post(&self.api_url)
            .header(AUTHORIZATION, format!("Bearer {}", self.jwt))
            .header(CONNECTION, "close")
            .multipart(form)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                let err = self.classify(e);
                metrics::record_pin_upload("transport_error");
                tracing::warn!(filename = %filename, error = %err, "Pin upload failed");
                return Err(err);
            }
        };

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            metrics::record_pin_upload("rejected");
            tracing::warn!(filename = %filename, status = status.as_u16(), "Pin service rejected upload");
            return Err(PinError::Protocol { status: status.as_u16(), body });
        }

        let parsed: PinResponse = serde_json::from_str(&body).map_err(|_| PinError::Protocol {
            status: status.as_u16(),
            body: body.clone(),
        })?;
        if parsed.ipfs_hash.trim().is_empty() {
            metrics::record_pin_upload("rejected");
            return Err(PinError::Protocol { status: status.as_u16(), body });
        }

        metrics::record_pin_upload("pinned");
        tracing::debug!(filename = %filename, size, cid = %parsed.ipfs_hash, "File pinned");
        Ok(parsed.ipfs_hash)
    }

    fn gateway_url(&self, cid: &str) -> String {
        format!("{}{}", self.gateway_url, cid)
    }

    async fn fetch(&self, cid: &str) -> Result<Bytes, PinError> {
        let response = self
            .http
            .get(self.gateway_url(cid))
            .header(CONNECTION, "close")
            .send()
            .await
            .map_err(|e| self.classify(e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PinError::Protocol { status: status.as_u16(), body });
        }
        response.bytes().await.map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Secret;

    #[test]
    fn test_gateway_url_joins_cid() {
        let config = PinningConfig {
            gateway_url: "https://gw.example/ipfs".into(),
            jwt: Secret::new("t"),
            ..PinningConfig::default()
        };
        let client = PinataClient::new(&config).unwrap();
        assert_eq!(client.gateway_url("bafkDEED"), "https://gw.example/ipfs/bafkDEED");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let config = PinningConfig {
            api_url: "http://127.0.0.1:1/pinning/pinFileToIPFS".into(),
            jwt: Secret::new("t"),
            upload_timeout_secs: 5,
            ..PinningConfig::default()
        };
        let client = PinataClient::new(&config).unwrap();
        let err = client.upload(Bytes::from_static(b"x"), "a.txt").await.unwrap_err();
        assert!(matches!(err, PinError::Transport(_)));
    }
}
