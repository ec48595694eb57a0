//! Outbound HTTP for the `send_webhook` action.
//!
//! Delivery is best effort: one attempt, a per-request timeout, and any
//! non-2xx status or transport error is reported back to the executor.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::HttpMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// Always `None` for GET.
    pub body: Option<Value>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboundError {
    #[error("endpoint responded with HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

#[async_trait]
pub trait WebhookSender: Send + Sync {
    /// Perform the request once.  `Ok` carries the 2xx status code.
    async fn send(&self, request: &OutboundRequest) -> Result<u16, OutboundError>;
}

/// [`WebhookSender`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestSender {
    client: Client,
}

impl ReqwestSender {
    pub fn new(timeout: Duration) -> Result<Self, OutboundError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("board-automation/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OutboundError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookSender for ReqwestSender {
    async fn send(&self, request: &OutboundRequest) -> Result<u16, OutboundError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
            HttpMethod::Put => self.client.put(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OutboundError::Transport(e.to_string()))?;
        let status = response.status();
        debug!(url = %request.url, status = status.as_u16(), "outbound webhook delivered");

        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(OutboundError::Status(status.as_u16()))
        }
    }
}
