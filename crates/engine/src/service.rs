//! Rule and webhook management.
//!
//! These services own every configuration write.  Validation runs here,
//! before anything is persisted; counters are never touched.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ConfigurationError, EngineError};
use crate::models::{
    ActionConfig, AutomationLog, AutomationRule, AutomationWebhook, Condition, TriggerConfig,
    TriggerType, WebhookSecret,
};
use crate::store::{LogStore, RuleStore, WebhookStore};
use crate::templates::{TemplateLibrary, TemplateOverrides};
use crate::validation::{validate_actions, validate_allowed_ips, validate_rule};

/// Logs returned when the caller gives no limit.
const DEFAULT_LOG_PAGE: usize = 50;

/// `null` becomes `Some(None)`, an absent key stays `None`.
fn nullable<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Body of a rule creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_config: TriggerConfig,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub max_executions: Option<i64>,
    pub created_by_id: String,
}

impl RuleDraft {
    /// A fresh rule on `board_id`, not yet validated or stored.
    pub fn into_rule(self, board_id: &str) -> AutomationRule {
        let mut rule = AutomationRule::new(board_id, self.name, self.trigger_type, self.created_by_id)
            .with_trigger_config(self.trigger_config)
            .with_priority(self.priority);
        rule.description = self.description;
        rule.enabled = self.enabled;
        rule.conditions = self.conditions;
        rule.actions = self.actions;
        rule.max_executions = self.max_executions;
        rule
    }
}

/// Partial rule update.  Absent fields are left alone; `description` and
/// `maxExecutions` can be cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub enabled: Option<bool>,
    pub trigger_type: Option<TriggerType>,
    pub trigger_config: Option<TriggerConfig>,
    pub conditions: Option<Vec<Condition>>,
    pub actions: Option<Vec<ActionConfig>>,
    pub priority: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_executions: Option<Option<i64>>,
}

impl RuleUpdate {
    fn apply(self, rule: &mut AutomationRule) {
        if let Some(name) = self.name {
            rule.name = name;
        }
        if let Some(description) = self.description {
            rule.description = description;
        }
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(trigger_type) = self.trigger_type {
            rule.trigger_type = trigger_type;
        }
        if let Some(trigger_config) = self.trigger_config {
            rule.trigger_config = trigger_config;
        }
        if let Some(conditions) = self.conditions {
            rule.conditions = conditions;
        }
        if let Some(actions) = self.actions {
            rule.actions = actions;
        }
        if let Some(priority) = self.priority {
            rule.priority = priority;
        }
        if let Some(max_executions) = self.max_executions {
            rule.max_executions = max_executions;
        }
    }
}

pub struct RuleService {
    rules: Arc<dyn RuleStore>,
    logs: Arc<dyn LogStore>,
    templates: Arc<TemplateLibrary>,
    max_log_page: usize,
}

impl RuleService {
    /// `rules` should be the same (cached) store the engine matches against,
    /// so writes invalidate what the matcher sees.
    pub fn new(
        rules: Arc<dyn RuleStore>,
        logs: Arc<dyn LogStore>,
        templates: Arc<TemplateLibrary>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            rules,
            logs,
            templates,
            max_log_page: config.max_log_page,
        }
    }

    pub fn templates(&self) -> &TemplateLibrary {
        &self.templates
    }

    pub async fn list(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError> {
        self.rules.rules_for_board(board_id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<AutomationRule, EngineError> {
        self.rules
            .get_rule(id)
            .await?
            .ok_or(EngineError::RuleNotFound(id))
    }

    pub async fn create(
        &self,
        board_id: &str,
        draft: RuleDraft,
    ) -> Result<AutomationRule, EngineError> {
        let rule = draft.into_rule(board_id);
        validate_rule(&rule)?;
        self.rules.insert_rule(&rule).await?;
        info!(rule_id = %rule.id, board_id, trigger = %rule.trigger_type, "rule created");
        Ok(rule)
    }

    pub async fn update(&self, id: Uuid, update: RuleUpdate) -> Result<AutomationRule, EngineError> {
        let mut rule = self.get(id).await?;
        update.apply(&mut rule);
        rule.updated_at = Utc::now();

        validate_rule(&rule)?;
        self.rules.update_rule(&rule).await?;
        info!(rule_id = %id, "rule updated");
        Ok(rule)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.rules.delete_rule(id).await? {
            return Err(EngineError::RuleNotFound(id));
        }
        info!(rule_id = %id, "rule deleted");
        Ok(())
    }

    /// Enable or disable a rule.  Setting the current state again is a
    /// no-op; counters and priority are never touched.
    pub async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<AutomationRule, EngineError> {
        let mut rule = self.get(id).await?;
        if rule.enabled == enabled {
            return Ok(rule);
        }
        rule.enabled = enabled;
        rule.updated_at = Utc::now();

        validate_rule(&rule)?;
        self.rules.update_rule(&rule).await?;
        info!(rule_id = %id, enabled, "rule toggled");
        Ok(rule)
    }

    /// Most recent logs of a rule.
    pub async fn logs(
        &self,
        id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        self.get(id).await?;
        let limit = limit.unwrap_or(DEFAULT_LOG_PAGE).clamp(1, self.max_log_page);
        self.logs.logs_for_rule(id, limit).await
    }

    /// Save a disabled draft copy of a catalog template on `board_id`.
    pub async fn instantiate_template(
        &self,
        template_id: &str,
        board_id: &str,
        created_by_id: &str,
        overrides: TemplateOverrides,
    ) -> Result<AutomationRule, EngineError> {
        let rule = self
            .templates
            .instantiate(template_id, board_id, created_by_id, overrides)?;
        validate_rule(&rule)?;
        self.rules.insert_rule(&rule).await?;
        info!(rule_id = %rule.id, board_id, template_id, "rule created from template");
        Ok(rule)
    }
}

// ---------------------------------------------------------------------------
// Webhooks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookDraft {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub require_signature: bool,
    #[serde(default)]
    pub allowed_ips: Vec<String>,
    pub actions: Vec<ActionConfig>,
    pub created_by_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookUpdate {
    pub name: Option<String>,
    pub enabled: Option<bool>,
    pub require_signature: Option<bool>,
    pub allowed_ips: Option<Vec<String>>,
    pub actions: Option<Vec<ActionConfig>>,
}

/// Response to create and rotate: the only place the secret is shown.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedWebhook {
    #[serde(flatten)]
    pub webhook: AutomationWebhook,
    pub secret: String,
}

impl CreatedWebhook {
    fn reveal(webhook: AutomationWebhook) -> Self {
        let secret = webhook.secret.expose().to_owned();
        Self { webhook, secret }
    }
}

pub struct WebhookService {
    webhooks: Arc<dyn WebhookStore>,
    logs: Arc<dyn LogStore>,
    config: EngineConfig,
}

fn validate_webhook(webhook: &AutomationWebhook) -> Result<(), ConfigurationError> {
    if webhook.name.trim().is_empty() {
        return Err(ConfigurationError::EmptyName);
    }
    validate_allowed_ips(&webhook.allowed_ips)?;
    validate_actions(&webhook.actions)
}

impl WebhookService {
    pub fn new(webhooks: Arc<dyn WebhookStore>, logs: Arc<dyn LogStore>, config: EngineConfig) -> Self {
        Self {
            webhooks,
            logs,
            config,
        }
    }

    pub async fn create(
        &self,
        board_id: &str,
        draft: WebhookDraft,
    ) -> Result<CreatedWebhook, EngineError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let webhook = AutomationWebhook {
            id,
            board_id: board_id.to_owned(),
            name: draft.name,
            secret: WebhookSecret::generate(),
            webhook_url: self.config.webhook_url(id),
            enabled: draft.enabled,
            require_signature: draft.require_signature,
            allowed_ips: draft.allowed_ips.iter().map(|ip| ip.trim().to_owned()).collect(),
            call_count: 0,
            last_called_at: None,
            actions: draft.actions,
            created_by_id: draft.created_by_id,
            created_at: now,
            updated_at: now,
        };

        validate_webhook(&webhook)?;
        self.webhooks.insert_webhook(&webhook).await?;
        info!(webhook_id = %id, board_id, "webhook created");
        Ok(CreatedWebhook::reveal(webhook))
    }

    pub async fn list(&self, board_id: &str) -> Result<Vec<AutomationWebhook>, EngineError> {
        self.webhooks.webhooks_for_board(board_id).await
    }

    pub async fn get(&self, id: Uuid) -> Result<AutomationWebhook, EngineError> {
        self.webhooks
            .get_webhook(id)
            .await?
            .ok_or(EngineError::WebhookNotFound(id))
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: WebhookUpdate,
    ) -> Result<AutomationWebhook, EngineError> {
        let mut webhook = self.get(id).await?;
        if let Some(name) = update.name {
            webhook.name = name;
        }
        if let Some(enabled) = update.enabled {
            webhook.enabled = enabled;
        }
        if let Some(require_signature) = update.require_signature {
            webhook.require_signature = require_signature;
        }
        if let Some(allowed_ips) = update.allowed_ips {
            webhook.allowed_ips = allowed_ips.iter().map(|ip| ip.trim().to_owned()).collect();
        }
        if let Some(actions) = update.actions {
            webhook.actions = actions;
        }
        webhook.updated_at = Utc::now();

        validate_webhook(&webhook)?;
        self.webhooks.update_webhook(&webhook).await?;
        info!(webhook_id = %id, "webhook updated");
        Ok(webhook)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), EngineError> {
        if !self.webhooks.delete_webhook(id).await? {
            return Err(EngineError::WebhookNotFound(id));
        }
        info!(webhook_id = %id, "webhook deleted");
        Ok(())
    }

    /// Replace the secret.  Signatures made with the old one stop verifying
    /// immediately.
    pub async fn rotate_secret(&self, id: Uuid) -> Result<CreatedWebhook, EngineError> {
        let mut webhook = self.get(id).await?;
        webhook.secret = WebhookSecret::generate();
        webhook.updated_at = Utc::now();
        self.webhooks.update_webhook(&webhook).await?;
        info!(webhook_id = %id, "webhook secret rotated");
        Ok(CreatedWebhook::reveal(webhook))
    }

    pub async fn logs(
        &self,
        id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        self.get(id).await?;
        let limit = limit.unwrap_or(DEFAULT_LOG_PAGE).clamp(1, self.config.max_log_page);
        self.logs.logs_for_webhook(id, limit).await
    }
}
