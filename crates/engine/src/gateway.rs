//! Inbound webhook gateway.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. the webhook exists and is enabled
//! 2. the caller's IP is on the allow-list (when one is configured)
//! 3. `X-Signature` is a valid HMAC-SHA256 of the raw body (when required)
//! 4. the body parses as JSON
//!
//! Nothing is counted or logged as an automation log until all four pass.
//! Authentication failures are reported through `tracing` only, and the
//! caller is told nothing beyond "unauthorized".

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use ipnetwork::IpNetwork;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::executor::ActionExecutor;
use crate::models::{AutomationWebhook, EventContext, LogSource, LogStatus, TriggerEvent, TriggerType};
use crate::recorder::LogRecorder;
use crate::store::WebhookStore;

/// Header carrying the hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Why an inbound call was refused.  Only ever logged; callers get a
/// generic rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    IpNotAllowed,
    MissingSignature,
    BadSignature,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("webhook not found")]
    NotFound,

    #[error("webhook is disabled")]
    Disabled,

    #[error("unauthorized")]
    Unauthorized(AuthFailure),

    #[error("invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// One inbound HTTP call, as seen by the gateway.
#[derive(Debug, Clone, Copy)]
pub struct InboundCall<'a> {
    pub webhook_id: Uuid,
    pub body: &'a [u8],
    pub signature: Option<&'a str>,
    pub remote_ip: Option<IpAddr>,
}

/// Result of an accepted call.
#[derive(Debug, Clone)]
pub struct GatewayReceipt {
    pub log_id: Uuid,
    pub status: LogStatus,
    /// `webhook_received` event carrying the same context, for rules that
    /// listen to this webhook.
    pub follow_up: TriggerEvent,
}

pub struct WebhookGateway {
    webhooks: Arc<dyn WebhookStore>,
    executor: Arc<ActionExecutor>,
    recorder: Arc<LogRecorder>,
}

impl WebhookGateway {
    pub fn new(
        webhooks: Arc<dyn WebhookStore>,
        executor: Arc<ActionExecutor>,
        recorder: Arc<LogRecorder>,
    ) -> Self {
        Self {
            webhooks,
            executor,
            recorder,
        }
    }

    #[instrument(skip(self, call), fields(webhook_id = %call.webhook_id))]
    pub async fn handle(&self, call: InboundCall<'_>) -> Result<GatewayReceipt, GatewayError> {
        let webhook = self
            .webhooks
            .get_webhook(call.webhook_id)
            .await?
            .ok_or(GatewayError::NotFound)?;
        if !webhook.enabled {
            return Err(GatewayError::Disabled);
        }
        if let Err(failure) = authenticate(&webhook, &call) {
            warn!(?failure, remote_ip = ?call.remote_ip, "rejected inbound webhook call");
            return Err(GatewayError::Unauthorized(failure));
        }
        let payload: Value = serde_json::from_slice(call.body)
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

        let calls = self.webhooks.record_call(webhook.id, Utc::now()).await?;

        let mut context = EventContext {
            webhook_id: Some(webhook.id.to_string()),
            ..EventContext::default()
        };
        if let Some(card_id) = referenced_card(&payload) {
            match self.executor.board().get_card(card_id).await {
                Ok(card) => context.task = Some(card),
                Err(e) => warn!(card_id, error = %e, "card referenced by webhook payload not loaded"),
            }
        }
        context.payload = Some(payload);

        let mut log = self
            .recorder
            .open(LogSource::Webhook(webhook.id), TriggerType::WebhookReceived.as_str(), &context)
            .await?;
        self.recorder.start(&mut log).await?;
        let outcomes = self
            .executor
            .execute_all(&webhook.board_id, &webhook.actions, &mut context)
            .await;
        let status = self.recorder.finish(&mut log, outcomes).await?;
        info!(calls, %status, "inbound webhook handled");

        Ok(GatewayReceipt {
            log_id: log.id,
            status,
            follow_up: TriggerEvent::new(TriggerType::WebhookReceived, webhook.board_id, context),
        })
    }
}

fn authenticate(webhook: &AutomationWebhook, call: &InboundCall<'_>) -> Result<(), AuthFailure> {
    if !webhook.allowed_ips.is_empty() {
        let allowed = call
            .remote_ip
            .is_some_and(|ip| ip_allowed(&webhook.allowed_ips, ip));
        if !allowed {
            return Err(AuthFailure::IpNotAllowed);
        }
    }
    if webhook.require_signature {
        let signature = call.signature.ok_or(AuthFailure::MissingSignature)?;
        if !webhook.secret.verify(call.body, signature) {
            return Err(AuthFailure::BadSignature);
        }
    }
    Ok(())
}

/// `true` if `ip` equals an entry or falls inside a CIDR entry.
/// Unparsable entries never match.
pub fn ip_allowed(entries: &[String], ip: IpAddr) -> bool {
    let ip = ip.to_canonical();
    entries.iter().any(|entry| {
        let entry = entry.trim();
        if let Ok(exact) = entry.parse::<IpAddr>() {
            return exact.to_canonical() == ip;
        }
        entry
            .parse::<IpNetwork>()
            .is_ok_and(|network| network.contains(ip))
    })
}

/// `cardId` or `taskId` at the top level of the payload.
fn referenced_card(payload: &Value) -> Option<&str> {
    ["cardId", "taskId"]
        .into_iter()
        .find_map(|key| payload.get(key).and_then(Value::as_str))
}
