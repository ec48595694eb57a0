//! `engine` crate: rule models, trigger matching, condition evaluation,
//! action execution, execution logs and the inbound webhook gateway.

pub mod config;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod gateway;
pub mod interpolate;
pub mod matcher;
pub mod models;
pub mod outbound;
pub mod recorder;
pub mod rule_engine;
pub mod service;
pub mod store;
pub mod templates;
pub mod validation;

pub use config::EngineConfig;
pub use error::{ConfigurationError, EngineError};
pub use executor::{ActionError, ActionExecutor};
pub use gateway::{GatewayError, GatewayReceipt, InboundCall, WebhookGateway, SIGNATURE_HEADER};
pub use models::{
    ActionConfig, AutomationLog, AutomationRule, AutomationWebhook, Condition, EventContext,
    LogStatus, TriggerConfig, TriggerEvent, TriggerType,
};
pub use outbound::{ReqwestSender, WebhookSender};
pub use recorder::LogRecorder;
pub use rule_engine::{EventReport, RuleEngine};
pub use service::{RuleDraft, RuleService, WebhookService};
pub use templates::TemplateLibrary;
