//! Inbound webhook endpoints and their signing secrets.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use super::ActionConfig;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";

// ---------------------------------------------------------------------------
// WebhookSecret
// ---------------------------------------------------------------------------

/// Shared HMAC key of an inbound webhook.  `Debug` never prints it and
/// webhooks never serialise it.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// 32 random bytes from the OS, hex encoded behind a `whsec_` prefix.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(format!("{SECRET_PREFIX}{}", hex::encode(bytes)))
    }

    /// Wrap a secret loaded from storage.
    pub fn from_raw(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn mac(&self) -> Option<HmacSha256> {
        HmacSha256::new_from_slice(self.0.as_bytes()).ok()
    }

    /// Lower-case hex HMAC-SHA256 of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        self.mac()
            .map(|mut mac| {
                mac.update(body);
                hex::encode(mac.finalize().into_bytes())
            })
            .unwrap_or_default()
    }

    /// Constant-time check of a hex signature, with or without a
    /// `sha256=` prefix.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let hex_sig = signature.trim();
        let hex_sig = hex_sig.strip_prefix("sha256=").unwrap_or(hex_sig);
        let Ok(expected) = hex::decode(hex_sig) else {
            return false;
        };
        let Some(mut mac) = self.mac() else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

// ---------------------------------------------------------------------------
// AutomationWebhook
// ---------------------------------------------------------------------------

/// An inbound endpoint external systems call to run a fixed action list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationWebhook {
    pub id: Uuid,
    pub board_id: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub secret: WebhookSecret,
    /// Public URL external callers POST to.
    pub webhook_url: String,
    pub enabled: bool,
    pub require_signature: bool,
    /// IPs or CIDR blocks; empty allows every caller.
    pub allowed_ips: Vec<String>,
    pub call_count: i64,
    pub last_called_at: Option<DateTime<Utc>>,
    pub actions: Vec<ActionConfig>,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
