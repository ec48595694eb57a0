//! `PgStore`: the Postgres-backed store.
//!
//! Thin mapping between domain types and `db` rows.  JSON columns hold the
//! serde form of trigger configs, conditions, actions and action outcomes.
//! Webhook secrets are encrypted before they reach the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::{AutomationLogRow, AutomationRuleRow, AutomationWebhookRow};
use db::repository::{logs, rules, webhooks};
use db::{DbError, DbPool, SecretCipher};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::{LogStore, RuleStore, WebhookStore};
use crate::error::EngineError;
use crate::models::{AutomationLog, AutomationRule, AutomationWebhook, WebhookSecret};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
    cipher: SecretCipher,
}

impl PgStore {
    pub fn new(pool: DbPool, cipher: SecretCipher) -> Self {
        Self { pool, cipher }
    }

    fn webhook_to_row(&self, w: &AutomationWebhook) -> Result<AutomationWebhookRow, EngineError> {
        Ok(AutomationWebhookRow {
            id: w.id,
            board_id: w.board_id.clone(),
            name: w.name.clone(),
            secret_ciphertext: self.cipher.encrypt(w.secret.expose())?,
            webhook_url: w.webhook_url.clone(),
            enabled: w.enabled,
            require_signature: w.require_signature,
            allowed_ips: w.allowed_ips.clone(),
            call_count: w.call_count,
            last_called_at: w.last_called_at,
            actions: serde_json::to_value(&w.actions)?,
            created_by_id: w.created_by_id.clone(),
            created_at: w.created_at,
            updated_at: w.updated_at,
        })
    }

    fn webhook_from_row(&self, row: AutomationWebhookRow) -> Result<AutomationWebhook, EngineError> {
        Ok(AutomationWebhook {
            id: row.id,
            secret: WebhookSecret::from_raw(self.cipher.decrypt(&row.secret_ciphertext)?),
            actions: column(row.actions, "automation_webhooks.actions")?,
            board_id: row.board_id,
            name: row.name,
            webhook_url: row.webhook_url,
            enabled: row.enabled,
            require_signature: row.require_signature,
            allowed_ips: row.allowed_ips,
            call_count: row.call_count,
            last_called_at: row.last_called_at,
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Decode a JSON column, naming it in the error.
fn column<T: DeserializeOwned>(value: Value, name: &str) -> Result<T, EngineError> {
    serde_json::from_value(value).map_err(|e| EngineError::CorruptRecord(format!("{name}: {e}")))
}

fn rule_to_row(rule: &AutomationRule) -> Result<AutomationRuleRow, EngineError> {
    Ok(AutomationRuleRow {
        id: rule.id,
        board_id: rule.board_id.clone(),
        name: rule.name.clone(),
        description: rule.description.clone(),
        enabled: rule.enabled,
        trigger_type: rule.trigger_type.as_str().to_owned(),
        trigger_config: serde_json::to_value(&rule.trigger_config)?,
        conditions: serde_json::to_value(&rule.conditions)?,
        actions: serde_json::to_value(&rule.actions)?,
        priority: rule.priority,
        max_executions: rule.max_executions,
        execution_count: rule.execution_count,
        last_executed_at: rule.last_executed_at,
        is_template: rule.is_template,
        template_id: rule.template_id.clone(),
        created_by_id: rule.created_by_id.clone(),
        created_at: rule.created_at,
        updated_at: rule.updated_at,
    })
}

fn rule_from_row(row: AutomationRuleRow) -> Result<AutomationRule, EngineError> {
    Ok(AutomationRule {
        id: row.id,
        trigger_type: row
            .trigger_type
            .parse()
            .map_err(EngineError::CorruptRecord)?,
        trigger_config: column(row.trigger_config, "automation_rules.trigger_config")?,
        conditions: column(row.conditions, "automation_rules.conditions")?,
        actions: column(row.actions, "automation_rules.actions")?,
        board_id: row.board_id,
        name: row.name,
        description: row.description,
        enabled: row.enabled,
        priority: row.priority,
        max_executions: row.max_executions,
        execution_count: row.execution_count,
        last_executed_at: row.last_executed_at,
        is_template: row.is_template,
        template_id: row.template_id,
        created_by_id: row.created_by_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn log_to_row(log: &AutomationLog) -> Result<AutomationLogRow, EngineError> {
    Ok(AutomationLogRow {
        id: log.id,
        rule_id: log.rule_id,
        webhook_id: log.webhook_id,
        trigger_event: log.trigger_event.clone(),
        trigger_data: log.trigger_data.clone(),
        status: log.status.as_str().to_owned(),
        actions_executed: serde_json::to_value(&log.actions_executed)?,
        error: log.error.clone(),
        started_at: log.started_at,
        completed_at: log.completed_at,
        duration_ms: log.duration_ms,
    })
}

fn log_from_row(row: AutomationLogRow) -> Result<AutomationLog, EngineError> {
    Ok(AutomationLog {
        id: row.id,
        status: row.status.parse().map_err(EngineError::CorruptRecord)?,
        actions_executed: column(row.actions_executed, "automation_logs.actions_executed")?,
        rule_id: row.rule_id,
        webhook_id: row.webhook_id,
        trigger_event: row.trigger_event,
        trigger_data: row.trigger_data,
        error: row.error,
        started_at: row.started_at,
        completed_at: row.completed_at,
        duration_ms: row.duration_ms,
    })
}

fn page(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl RuleStore for PgStore {
    async fn enabled_rules_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<AutomationRule>, EngineError> {
        rules::list_enabled_rules_for_board(&self.pool, board_id)
            .await?
            .into_iter()
            .map(rule_from_row)
            .collect()
    }

    async fn rules_for_board(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError> {
        rules::list_rules_for_board(&self.pool, board_id)
            .await?
            .into_iter()
            .map(rule_from_row)
            .collect()
    }

    async fn get_rule(&self, id: Uuid) -> Result<Option<AutomationRule>, EngineError> {
        rules::get_rule(&self.pool, id)
            .await?
            .map(rule_from_row)
            .transpose()
    }

    async fn insert_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        rules::insert_rule(&self.pool, &rule_to_row(rule)?).await?;
        Ok(())
    }

    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        match rules::update_rule(&self.pool, &rule_to_row(rule)?).await {
            Err(DbError::NotFound) => Err(EngineError::RuleNotFound(rule.id)),
            other => Ok(other?),
        }
    }

    async fn delete_rule(&self, id: Uuid) -> Result<bool, EngineError> {
        Ok(rules::delete_rule(&self.pool, id).await?)
    }

    async fn claim_execution(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<i64>, EngineError> {
        Ok(rules::claim_execution(&self.pool, id, at).await?)
    }
}

#[async_trait]
impl LogStore for PgStore {
    async fn insert_log(&self, log: &AutomationLog) -> Result<(), EngineError> {
        logs::insert_log(&self.pool, &log_to_row(log)?).await?;
        Ok(())
    }

    async fn update_log(&self, log: &AutomationLog) -> Result<(), EngineError> {
        if logs::update_open_log(&self.pool, &log_to_row(log)?).await? {
            return Ok(());
        }
        match logs::get_log(&self.pool, log.id).await? {
            Some(_) => Err(EngineError::LogFinalized(log.id)),
            None => Err(EngineError::LogNotFound(log.id)),
        }
    }

    async fn get_log(&self, id: Uuid) -> Result<Option<AutomationLog>, EngineError> {
        logs::get_log(&self.pool, id)
            .await?
            .map(log_from_row)
            .transpose()
    }

    async fn logs_for_rule(
        &self,
        rule_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        logs::list_logs_for_rule(&self.pool, rule_id, page(limit))
            .await?
            .into_iter()
            .map(log_from_row)
            .collect()
    }

    async fn logs_for_webhook(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        logs::list_logs_for_webhook(&self.pool, webhook_id, page(limit))
            .await?
            .into_iter()
            .map(log_from_row)
            .collect()
    }
}

#[async_trait]
impl WebhookStore for PgStore {
    async fn insert_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError> {
        webhooks::insert_webhook(&self.pool, &self.webhook_to_row(webhook)?).await?;
        Ok(())
    }

    async fn get_webhook(&self, id: Uuid) -> Result<Option<AutomationWebhook>, EngineError> {
        webhooks::get_webhook(&self.pool, id)
            .await?
            .map(|row| self.webhook_from_row(row))
            .transpose()
    }

    async fn webhooks_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<AutomationWebhook>, EngineError> {
        webhooks::list_webhooks_for_board(&self.pool, board_id)
            .await?
            .into_iter()
            .map(|row| self.webhook_from_row(row))
            .collect()
    }

    async fn update_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError> {
        match webhooks::update_webhook(&self.pool, &self.webhook_to_row(webhook)?).await {
            Err(DbError::NotFound) => Err(EngineError::WebhookNotFound(webhook.id)),
            other => Ok(other?),
        }
    }

    async fn delete_webhook(&self, id: Uuid) -> Result<bool, EngineError> {
        Ok(webhooks::delete_webhook(&self.pool, id).await?)
    }

    async fn record_call(&self, id: Uuid, at: DateTime<Utc>) -> Result<i64, EngineError> {
        match webhooks::record_call(&self.pool, id, at).await {
            Err(DbError::NotFound) => Err(EngineError::WebhookNotFound(id)),
            other => Ok(other?),
        }
    }
}
