use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx from the coordinator. `kind` is the stable `error` field when present.
    #[error("coordinator returned {status} ({kind}): {message}")]
    Api {
        status: StatusCode,
        kind: String,
        message: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: Value,
}

/// A transaction accepted by the ledger but not waited on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pending {
    pub status: String,
    pub tx_hash: String,
}

pub struct EstateClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl EstateClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Attach a bearer token to every following request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, SdkError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
            return Err(SdkError::Api {
                status,
                kind: body["error"].as_str().unwrap_or("unknown").to_string(),
                message: body["message"].as_str().map(str::to_string).unwrap_or(text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub async fn health(&self) -> Result<Value, SdkError> {
        self.send(self.request(reqwest::Method::GET, "/health")).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, SdkError> {
        let body = json!({ "email": email, "password": password });
        self.send(self.request(reqwest::Method::POST, "/login").json(&body)).await
    }

    pub async fn approve_user(&self, wallet_address: &str) -> Result<Value, SdkError> {
        let body = json!({ "wallet_address": wallet_address });
        self.send(self.request(reqwest::Method::POST, "/approve-user").json(&body)).await
    }

    /// `amount` is an integer in the stablecoin's base units.
    pub async fn distribute_revenue(
        &self,
        token_address: &str,
        stablecoin_address: &str,
        amount: &str,
    ) -> Result<Pending, SdkError> {
        let body = json!({
            "token_address": token_address,
            "stablecoin_address": stablecoin_address,
            "amount": amount,
        });
        self.send(self.request(reqwest::Method::POST, "/revenue/distribute").json(&body))
            .await
    }

    pub async fn upload_requests(&self) -> Result<Value, SdkError> {
        self.send(self.request(reqwest::Method::GET, "/property-upload-requests"))
            .await
    }

    pub async fn approve_request(&self, id: &str) -> Result<Value, SdkError> {
        let path = format!("/property-upload-requests/{}/approve", id);
        self.send(self.request(reqwest::Method::POST, &path)).await
    }

    pub async fn reject_request(&self, id: &str, reason: &str) -> Result<Value, SdkError> {
        let path = format!("/property-upload-requests/{}/reject", id);
        let body = json!({ "reason": reason });
        self.send(self.request(reqwest::Method::POST, &path).json(&body)).await
    }
}
