//! `MemoryStore`: rules, logs and webhooks kept in process memory.
//!
//! Used by tests and when the service runs without `DATABASE_URL`.  All
//! three store traits share one mutex, which is what makes counter
//! increments atomic here.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{LogStore, RuleStore, WebhookStore};
use crate::error::EngineError;
use crate::models::{AutomationLog, AutomationRule, AutomationWebhook};

#[derive(Debug, Default)]
struct State {
    rules: HashMap<Uuid, AutomationRule>,
    logs: HashMap<Uuid, AutomationLog>,
    webhooks: HashMap<Uuid, AutomationWebhook>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored logs, across rules and webhooks.
    pub fn log_count(&self) -> usize {
        self.state().logs.len()
    }
}

fn newest_first<T>(items: &mut [T], created: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created(item)));
}

fn recent_logs(
    state: &State,
    limit: usize,
    keep: impl Fn(&AutomationLog) -> bool,
) -> Vec<AutomationLog> {
    let mut logs: Vec<AutomationLog> = state.logs.values().filter(|l| keep(l)).cloned().collect();
    newest_first(&mut logs, |l| l.started_at);
    logs.truncate(limit);
    logs
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn enabled_rules_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<AutomationRule>, EngineError> {
        Ok(self
            .state()
            .rules
            .values()
            .filter(|r| r.enabled && r.board_id == board_id)
            .cloned()
            .collect())
    }

    async fn rules_for_board(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError> {
        let mut rules: Vec<AutomationRule> = self
            .state()
            .rules
            .values()
            .filter(|r| r.board_id == board_id)
            .cloned()
            .collect();
        newest_first(&mut rules, |r| r.created_at);
        Ok(rules)
    }

    async fn get_rule(&self, id: Uuid) -> Result<Option<AutomationRule>, EngineError> {
        Ok(self.state().rules.get(&id).cloned())
    }

    async fn insert_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        self.state().rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        let mut state = self.state();
        let stored = state
            .rules
            .get_mut(&rule.id)
            .ok_or(EngineError::RuleNotFound(rule.id))?;
        let (count, last) = (stored.execution_count, stored.last_executed_at);
        *stored = rule.clone();
        stored.execution_count = count;
        stored.last_executed_at = last;
        Ok(())
    }

    async fn delete_rule(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut state = self.state();
        let existed = state.rules.remove(&id).is_some();
        state.logs.retain(|_, log| log.rule_id != Some(id));
        Ok(existed)
    }

    async fn claim_execution(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<i64>, EngineError> {
        let mut state = self.state();
        let Some(rule) = state.rules.get_mut(&id) else {
            return Ok(None);
        };
        if !rule.has_capacity() {
            return Ok(None);
        }
        rule.execution_count += 1;
        rule.last_executed_at = Some(at);
        Ok(Some(rule.execution_count))
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_log(&self, log: &AutomationLog) -> Result<(), EngineError> {
        self.state().logs.insert(log.id, log.clone());
        Ok(())
    }

    async fn update_log(&self, log: &AutomationLog) -> Result<(), EngineError> {
        let mut state = self.state();
        let stored = state
            .logs
            .get_mut(&log.id)
            .ok_or(EngineError::LogNotFound(log.id))?;
        if stored.status.is_terminal() {
            return Err(EngineError::LogFinalized(log.id));
        }
        *stored = log.clone();
        Ok(())
    }

    async fn get_log(&self, id: Uuid) -> Result<Option<AutomationLog>, EngineError> {
        Ok(self.state().logs.get(&id).cloned())
    }

    async fn logs_for_rule(
        &self,
        rule_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        Ok(recent_logs(&self.state(), limit, |l| l.rule_id == Some(rule_id)))
    }

    async fn logs_for_webhook(
        &self,
        webhook_id: Uuid,
        limit: usize,
    ) -> Result<Vec<AutomationLog>, EngineError> {
        Ok(recent_logs(&self.state(), limit, |l| l.webhook_id == Some(webhook_id)))
    }
}

#[async_trait]
impl WebhookStore for MemoryStore {
    async fn insert_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError> {
        self.state().webhooks.insert(webhook.id, webhook.clone());
        Ok(())
    }

    async fn get_webhook(&self, id: Uuid) -> Result<Option<AutomationWebhook>, EngineError> {
        Ok(self.state().webhooks.get(&id).cloned())
    }

    async fn webhooks_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<AutomationWebhook>, EngineError> {
        let mut hooks: Vec<AutomationWebhook> = self
            .state()
            .webhooks
            .values()
            .filter(|w| w.board_id == board_id)
            .cloned()
            .collect();
        newest_first(&mut hooks, |w| w.created_at);
        Ok(hooks)
    }

    async fn update_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError> {
        let mut state = self.state();
        let stored = state
            .webhooks
            .get_mut(&webhook.id)
            .ok_or(EngineError::WebhookNotFound(webhook.id))?;
        let (count, last) = (stored.call_count, stored.last_called_at);
        *stored = webhook.clone();
        stored.call_count = count;
        stored.last_called_at = last;
        Ok(())
    }

    async fn delete_webhook(&self, id: Uuid) -> Result<bool, EngineError> {
        let mut state = self.state();
        let existed = state.webhooks.remove(&id).is_some();
        state.logs.retain(|_, log| log.webhook_id != Some(id));
        Ok(existed)
    }

    async fn record_call(&self, id: Uuid, at: DateTime<Utc>) -> Result<i64, EngineError> {
        let mut state = self.state();
        let hook = state
            .webhooks
            .get_mut(&id)
            .ok_or(EngineError::WebhookNotFound(id))?;
        hook.call_count += 1;
        hook.last_called_at = Some(at);
        Ok(hook.call_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionConfig, LogSource, LogStatus, TriggerType};
    use serde_json::json;

    fn rule(board: &str) -> AutomationRule {
        AutomationRule::new(board, "r", TriggerType::CardCreated, "u1")
            .with_action(ActionConfig::ArchiveCard {})
    }

    #[tokio::test]
    async fn enabled_rules_are_scoped_to_the_board() {
        let store = MemoryStore::new();
        let mut disabled = rule("b1");
        disabled.enabled = false;
        store.insert_rule(&rule("b1")).await.unwrap();
        store.insert_rule(&disabled).await.unwrap();
        store.insert_rule(&rule("b2")).await.unwrap();

        assert_eq!(store.enabled_rules_for_board("b1").await.unwrap().len(), 1);
        assert_eq!(store.rules_for_board("b1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn claim_stops_at_the_cap() {
        let store = MemoryStore::new();
        let capped = rule("b1").with_max_executions(2);
        store.insert_rule(&capped).await.unwrap();

        let now = Utc::now();
        assert_eq!(store.claim_execution(capped.id, now).await.unwrap(), Some(1));
        assert_eq!(store.claim_execution(capped.id, now).await.unwrap(), Some(2));
        assert_eq!(store.claim_execution(capped.id, now).await.unwrap(), None);

        let stored = store.get_rule(capped.id).await.unwrap().unwrap();
        assert_eq!(stored.execution_count, 2);
        assert_eq!(stored.last_executed_at, Some(now));
    }

    #[tokio::test]
    async fn claiming_a_deleted_rule_yields_no_slot() {
        let store = MemoryStore::new();
        let r = rule("b1");
        store.insert_rule(&r).await.unwrap();
        store.delete_rule(r.id).await.unwrap();

        assert_eq!(store.claim_execution(r.id, Utc::now()).await.unwrap(), None);
        assert_eq!(store.claim_execution(Uuid::new_v4(), Utc::now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_does_not_clobber_counters() {
        let store = MemoryStore::new();
        let r = rule("b1");
        store.insert_rule(&r).await.unwrap();
        store.claim_execution(r.id, Utc::now()).await.unwrap();

        let mut edited = r.clone();
        edited.name = "renamed".into();
        store.update_rule(&edited).await.unwrap();

        let stored = store.get_rule(r.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "renamed");
        assert_eq!(stored.execution_count, 1);
    }

    #[tokio::test]
    async fn deleting_a_rule_cascades_to_its_logs() {
        let store = MemoryStore::new();
        let r = rule("b1");
        store.insert_rule(&r).await.unwrap();
        let log = AutomationLog::pending(LogSource::Rule(r.id), "card_created", json!({}));
        store.insert_log(&log).await.unwrap();

        assert!(store.delete_rule(r.id).await.unwrap());
        assert!(store.get_log(log.id).await.unwrap().is_none());
        assert!(!store.delete_rule(r.id).await.unwrap());
    }

    #[tokio::test]
    async fn terminal_logs_are_immutable() {
        let store = MemoryStore::new();
        let mut log = AutomationLog::pending(LogSource::Rule(Uuid::new_v4()), "card_created", json!({}));
        store.insert_log(&log).await.unwrap();

        log.transition(LogStatus::Skipped).unwrap();
        store.update_log(&log).await.unwrap();

        log.error = Some("rewritten".into());
        let err = store.update_log(&log).await.unwrap_err();
        assert!(matches!(err, EngineError::LogFinalized(_)));
        assert_eq!(store.get_log(log.id).await.unwrap().unwrap().error, None);
    }
}
