//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::LogStatus;

/// A rule or webhook configuration that cannot be saved in its requested
/// state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("name must not be empty")]
    EmptyName,

    /// Enabled rules and webhooks must do something.
    #[error("at least one action is required")]
    EmptyActions,

    #[error("action #{index} ({action}) is missing required field '{field}'")]
    MissingField {
        index: usize,
        action: &'static str,
        field: &'static str,
    },

    #[error("action #{index} ({action}) has an invalid '{field}': {reason}")]
    InvalidField {
        index: usize,
        action: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("maxExecutions must be positive, got {0}")]
    InvalidMaxExecutions(i64),

    #[error("'{0}' is not an IP address or CIDR block")]
    InvalidAllowedIp(String),
}

/// Errors produced by the engine's services and stores.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    // ------ Lookup errors ------

    #[error("rule '{0}' not found")]
    RuleNotFound(Uuid),

    #[error("webhook '{0}' not found")]
    WebhookNotFound(Uuid),

    #[error("log '{0}' not found")]
    LogNotFound(Uuid),

    #[error("template '{0}' not found")]
    TemplateNotFound(String),

    // ------ Log lifecycle errors ------

    /// The log already reached `success`, `failed` or `skipped`.
    #[error("log '{0}' is finalized and cannot be modified")]
    LogFinalized(Uuid),

    #[error("illegal log transition {from} -> {to}")]
    InvalidTransition { from: LogStatus, to: LogStatus },

    // ------ Persistence errors ------

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt stored record: {0}")]
    CorruptRecord(String),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),
}
