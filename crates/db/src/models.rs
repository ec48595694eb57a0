//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models; they carry no domain behaviour.
//! Domain types live in the `engine` crate.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// automation_rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct AutomationRuleRow {
    pub id: Uuid,
    pub board_id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger_type: String,
    /// JSON object of trigger filters.
    pub trigger_config: Value,
    /// JSON array of conditions.
    pub conditions: Value,
    /// JSON array of tagged action objects.
    pub actions: Value,
    pub priority: i32,
    pub max_executions: Option<i64>,
    pub execution_count: i64,
    pub last_executed_at: Option<DateTime<Utc>>,
    pub is_template: bool,
    pub template_id: Option<String>,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// automation_logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct AutomationLogRow {
    pub id: Uuid,
    pub rule_id: Option<Uuid>,
    pub webhook_id: Option<Uuid>,
    pub trigger_event: String,
    pub trigger_data: Value,
    pub status: String,
    pub actions_executed: Value,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

// ---------------------------------------------------------------------------
// automation_webhooks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, FromRow)]
pub struct AutomationWebhookRow {
    pub id: Uuid,
    pub board_id: String,
    pub name: String,
    /// AES-256-GCM encrypted secret, see [`crate::SecretCipher`].
    pub secret_ciphertext: String,
    pub webhook_url: String,
    pub enabled: bool,
    pub require_signature: bool,
    pub allowed_ips: Vec<String>,
    pub call_count: i64,
    pub last_called_at: Option<DateTime<Utc>>,
    pub actions: Value,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
