//! REST client for the platform ledger API
//!
//! Every call carries the bearer token when one is held. A 401 from any
//! endpoint drops the token, both in memory and in the token file, so the
//! next run has to log in again.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::LedgerError;
use super::types::{LedgerEntryRequest, LedgerReply, PreWithdrawRequest, PreWithdrawResponse};
use super::LedgerApi;
use crate::auth::TokenStore;
use crate::config::LedgerConfig;

pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
    store: Option<TokenStore>,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.has_token())
            .finish()
    }
}

impl LedgerClient {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            store: None,
        })
    }

    /// Back the bearer token with a file; a token already on disk is picked up.
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        let existing = store.load();
        if let Ok(mut guard) = self.token.write() {
            *guard = existing;
        }
        self.store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_token(&self) -> bool {
        self.token.read().map(|t| t.is_some()).unwrap_or(false)
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    /// Hold `token` for subsequent calls and persist it when a store is set.
    pub fn set_token(&self, token: String) -> Result<(), LedgerError> {
        if let Some(store) = &self.store {
            store
                .save(&token)
                .map_err(|e| LedgerError::Transport(format!("Failed to save token: {}", e)))?;
        }
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token);
        }
        Ok(())
    }

    pub fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
        if let Some(store) = &self.store
            && let Err(e) = store.clear()
        {
            warn!(error = %e, "Failed to remove token file");
        }
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, LedgerError> {
        let value = self.request::<()>(Method::GET, path, None).await?;
        decode(value)
    }

    /// GET and return the `data` member when the reply is enveloped.
    pub async fn get_data<R: DeserializeOwned>(&self, path: &str) -> Result<R, LedgerError> {
        let value = self.request::<()>(Method::GET, path, None).await?;
        decode(unwrap_data(value))
    }

    pub async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, LedgerError> {
        let value = self.request(Method::POST, path, Some(body)).await?;
        decode(value)
    }

    pub async fn post_data<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, LedgerError> {
        let value = self.request(Method::POST, path, Some(body)).await?;
        decode(unwrap_data(value))
    }

    /// POST to a write endpoint; `success: false` becomes [`LedgerError::Rejected`].
    pub async fn post_reply<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<LedgerReply, LedgerError> {
        self.write(Method::POST, path, body).await
    }

    /// PUT counterpart of [`Self::post_reply`]
    pub async fn put_reply<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<LedgerReply, LedgerError> {
        self.write(Method::PUT, path, body).await
    }

    async fn write<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<LedgerReply, LedgerError> {
        let reply: LedgerReply = decode(self.request(method, path, Some(body)).await?)?;
        if reply.is_rejected() {
            let message = reply
                .error
                .clone()
                .or_else(|| reply.message())
                .unwrap_or_else(|| format!("{} rejected", path));
            return Err(LedgerError::Rejected(message));
        }
        Ok(reply)
    }

    async fn request<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, LedgerError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Ledger request");

        let mut builder = self.http.request(method, &url);
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LedgerError::Timeout(path.to_string())
            } else {
                LedgerError::Transport(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LedgerError::Transport(format!("Failed to read response: {}", e)))?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "Ledger rejected credentials, clearing token");
            self.clear_token();
            return Err(LedgerError::Unauthorized);
        }

        let value: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                if status.is_success() {
                    LedgerError::Decode(format!("Invalid JSON from {}: {}", path, e))
                } else {
                    LedgerError::Status {
                        status: status.as_u16(),
                        message: text.clone(),
                    }
                }
            })?
        };

        if !status.is_success() {
            return Err(LedgerError::Status {
                status: status.as_u16(),
                message: error_message(&value).unwrap_or_else(|| status.to_string()),
            });
        }

        Ok(value)
    }
}

#[async_trait]
impl LedgerApi for LedgerClient {
    async fn record_deposit(&self, entry: &LedgerEntryRequest) -> Result<LedgerReply, LedgerError> {
        self.post_reply("/deposit", entry).await
    }

    async fn record_withdraw(
        &self,
        entry: &LedgerEntryRequest,
    ) -> Result<LedgerReply, LedgerError> {
        self.post_reply("/withdraw", entry).await
    }

    async fn pre_withdraw(&self, amount: Decimal) -> Result<PreWithdrawResponse, LedgerError> {
        self.post_data("/withdraw/pre", &PreWithdrawRequest { dan_amount: amount })
            .await
    }
}

/// The backend sends payloads both as `{ success, data }` and bare.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !data.is_null() => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .find_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, LedgerError> {
    serde_json::from_value(value).map_err(|e| LedgerError::Decode(e.to_string()))
}
