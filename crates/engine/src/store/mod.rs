//! Persistence seams for rules, logs and webhooks.
//!
//! The engine only talks to these traits.  [`memory::MemoryStore`] backs
//! tests and database-less runs, [`postgres::PgStore`] backs production, and
//! [`cache::CachedRuleStore`] sits in front of either for rule matching.

pub mod cache;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{AutomationLog, AutomationRule, AutomationWebhook};

pub use cache::CachedRuleStore;
pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Enabled rules of a board, in no particular order.
    async fn enabled_rules_for_board(&self, board_id: &str)
        -> Result<Vec<AutomationRule>, EngineError>;

    /// Every rule of a board, newest first.
    async fn rules_for_board(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError>;

    async fn get_rule(&self, id: Uuid) -> Result<Option<AutomationRule>, EngineError>;

    async fn insert_rule(&self, rule: &AutomationRule) -> Result<(), EngineError>;

    /// Overwrite a rule's configuration.  `executionCount` and
    /// `lastExecutedAt` are owned by [`RuleStore::claim_execution`] and left
    /// untouched.
    ///
    /// # Errors
    /// [`EngineError::RuleNotFound`] if the rule does not exist.
    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), EngineError>;

    /// Delete a rule and its logs.  Returns `false` if it did not exist.
    async fn delete_rule(&self, id: Uuid) -> Result<bool, EngineError>;

    /// Atomically take one execution slot: bump `executionCount` and stamp
    /// `lastExecutedAt`, unless `maxExecutions` has already been reached.
    ///
    /// Returns the new count, or `None` when the cap is exhausted or the rule
    /// no longer exists.
    async fn claim_execution(&self, id: Uuid, at: DateTime<Utc>)
        -> Result<Option<i64>, EngineError>;
}

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn insert_log(&self, log: &AutomationLog) -> Result<(), EngineError>;

    /// Persist a log's new state.
    ///
    /// # Errors
    /// [`EngineError::LogFinalized`] if the stored log is already terminal,
    /// [`EngineError::LogNotFound`] if it does not exist.
    async fn update_log(&self, log: &AutomationLog) -> Result<(), EngineError>;

    async fn get_log(&self, id: Uuid) -> Result<Option<AutomationLog>, EngineError>;

    /// Most recent first.
    async fn logs_for_rule(&self, rule_id: Uuid, limit: usize)
        -> Result<Vec<AutomationLog>, EngineError>;

    /// Most recent first.
    async fn logs_for_webhook(&self, webhook_id: Uuid, limit: usize)
        -> Result<Vec<AutomationLog>, EngineError>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn insert_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError>;

    async fn get_webhook(&self, id: Uuid) -> Result<Option<AutomationWebhook>, EngineError>;

    /// Newest first.
    async fn webhooks_for_board(&self, board_id: &str)
        -> Result<Vec<AutomationWebhook>, EngineError>;

    /// Overwrite configuration and secret.  `callCount` and `lastCalledAt`
    /// are owned by [`WebhookStore::record_call`].
    async fn update_webhook(&self, webhook: &AutomationWebhook) -> Result<(), EngineError>;

    /// Delete a webhook and its logs.  Returns `false` if it did not exist.
    async fn delete_webhook(&self, id: Uuid) -> Result<bool, EngineError>;

    /// Atomically bump `callCount` and stamp `lastCalledAt`; returns the new
    /// count.
    async fn record_call(&self, id: Uuid, at: DateTime<Utc>) -> Result<i64, EngineError>;
}
