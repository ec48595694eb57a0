//! Core domain models for the automation engine.
//!
//! These types are the source of truth for what a rule, an event and an
//! execution log look like in memory.  They serialise to/from the JSON
//! exchanged with the management UI and the JSONB columns in Postgres, so
//! field names are camelCase and enum tags snake_case.

pub mod action;
pub mod condition;
pub mod event;
pub mod log;
pub mod rule;
pub mod webhook;

pub use action::{ActionConfig, HttpMethod};
pub use condition::{Condition, ConditionField, ConditionOperator, ConditionValue};
pub use event::{ChecklistRef, EventContext, TriggerEvent};
pub use log::{ActionOutcome, ActionStatus, AutomationLog, LogSource, LogStatus};
pub use rule::{AutomationRule, TriggerConfig, TriggerType};
pub use webhook::{AutomationWebhook, WebhookSecret};
