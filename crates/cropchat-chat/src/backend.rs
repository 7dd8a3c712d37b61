//! Advisory backend client.
//!
//! One `POST` per utterance carrying `{ message, sessionId }`, answered with
//! `{ response, sessionId }`. The identity token travels in a header supplied
//! by the injected [`IdentityProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderName;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use cropchat_core::config::BackendConfig;

use crate::error::RequestError;
use crate::identity::IdentityProvider;

/// Outbound request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    /// Omitted from the body until the backend has issued a token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Inbound response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
}

/// Transport for one request/response exchange.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, RequestError>;
}

/// HTTP transport using `reqwest`.
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
    auth_header: HeaderName,
    identity: Arc<dyn IdentityProvider>,
}

impl std::fmt::Debug for HttpChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatBackend")
            .field("endpoint", &self.endpoint)
            .field("auth_header", &self.auth_header)
            .finish()
    }
}

impl HttpChatBackend {
    /// Build a client for `config.endpoint` with the configured timeout.
    pub fn new(
        config: &BackendConfig,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, RequestError> {
        let auth_header = HeaderName::from_bytes(config.auth_header.as_bytes()).map_err(|e| {
            RequestError::InvalidConfig(format!(
                "invalid auth header name {:?}: {}",
                config.auth_header, e
            ))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            auth_header,
            identity,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<ChatReply, RequestError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        match self.identity.token() {
            Some(token) => builder = builder.header(self.auth_header.clone(), token),
            None => tracing::debug!("Sending chat request without identity token"),
        }

        let response = builder.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(RequestError::Unauthorized);
        }
        if !status.is_success() {
            return Err(RequestError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        decode_reply(&body)
    }
}

/// Parse a response body, rejecting any shape other than `{ response, sessionId }`.
pub fn decode_reply(body: &[u8]) -> Result<ChatReply, RequestError> {
    serde_json::from_slice(body).map_err(|e| RequestError::Malformed(e.to_string()))
}
