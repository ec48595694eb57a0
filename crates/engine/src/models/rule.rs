//! Automation rules and their triggers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ActionConfig, Condition};

// ---------------------------------------------------------------------------
// TriggerType
// ---------------------------------------------------------------------------

/// The domain or external event that makes a rule eligible to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    CardCreated,
    CardMoved,
    CardUpdated,
    DueDateApproaching,
    DueDatePassed,
    ChecklistCompleted,
    ChecklistItemChecked,
    CommentAdded,
    CommentMention,
    LabelAdded,
    LabelRemoved,
    MemberAssigned,
    MemberUnassigned,
    AttachmentAdded,
    WebhookReceived,
    /// Synthesised by the external cron scheduler.
    Scheduled,
}

impl TriggerType {
    pub const ALL: [TriggerType; 16] = [
        Self::CardCreated,
        Self::CardMoved,
        Self::CardUpdated,
        Self::DueDateApproaching,
        Self::DueDatePassed,
        Self::ChecklistCompleted,
        Self::ChecklistItemChecked,
        Self::CommentAdded,
        Self::CommentMention,
        Self::LabelAdded,
        Self::LabelRemoved,
        Self::MemberAssigned,
        Self::MemberUnassigned,
        Self::AttachmentAdded,
        Self::WebhookReceived,
        Self::Scheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CardCreated => "card_created",
            Self::CardMoved => "card_moved",
            Self::CardUpdated => "card_updated",
            Self::DueDateApproaching => "due_date_approaching",
            Self::DueDatePassed => "due_date_passed",
            Self::ChecklistCompleted => "checklist_completed",
            Self::ChecklistItemChecked => "checklist_item_checked",
            Self::CommentAdded => "comment_added",
            Self::CommentMention => "comment_mention",
            Self::LabelAdded => "label_added",
            Self::LabelRemoved => "label_removed",
            Self::MemberAssigned => "member_assigned",
            Self::MemberUnassigned => "member_unassigned",
            Self::AttachmentAdded => "attachment_added",
            Self::WebhookReceived => "webhook_received",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown trigger type: {s}"))
    }
}

// ---------------------------------------------------------------------------
// TriggerConfig
// ---------------------------------------------------------------------------

/// Trigger filters.  Each trigger type reads only the fields relevant to
/// it; the rest (and any unknown keys) are ignored.  An unset field is a
/// wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TriggerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_before_due: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_before_due: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cron_expression: Option<String>,
}

// ---------------------------------------------------------------------------
// AutomationRule
// ---------------------------------------------------------------------------

/// A board-scoped trigger + conditions + actions configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    pub id: Uuid,
    pub board_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub trigger_config: TriggerConfig,
    /// AND-combined.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Executed in order.  Must be non-empty for an enabled rule.
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub max_executions: Option<i64>,
    #[serde(default)]
    pub execution_count: i64,
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default)]
    pub template_id: Option<String>,
    pub created_by_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationRule {
    /// An enabled rule with no conditions or actions yet.
    pub fn new(
        board_id: impl Into<String>,
        name: impl Into<String>,
        trigger_type: TriggerType,
        created_by_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            board_id: board_id.into(),
            name: name.into(),
            description: None,
            enabled: true,
            trigger_type,
            trigger_config: TriggerConfig::default(),
            conditions: Vec::new(),
            actions: Vec::new(),
            priority: 0,
            max_executions: None,
            execution_count: 0,
            last_executed_at: None,
            is_template: false,
            template_id: None,
            created_by_id: created_by_id.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_trigger_config(mut self, config: TriggerConfig) -> Self {
        self.trigger_config = config;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_action(mut self, action: ActionConfig) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_executions(mut self, max: i64) -> Self {
        self.max_executions = Some(max);
        self
    }

    /// `false` once `execution_count` has reached `max_executions`.
    pub fn has_capacity(&self) -> bool {
        self.max_executions
            .map_or(true, |max| self.execution_count < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_type_round_trips_through_str() {
        for t in TriggerType::ALL {
            assert_eq!(t.as_str().parse::<TriggerType>().unwrap(), t);
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.as_str()));
        }
        assert!("card_deleted".parse::<TriggerType>().is_err());
    }

    #[test]
    fn trigger_config_ignores_unknown_keys() {
        let config: TriggerConfig = serde_json::from_value(json!({
            "toListId": "done",
            "colour": "blue",
            "someFutureField": { "nested": true }
        }))
        .unwrap();

        assert_eq!(config.to_list_id.as_deref(), Some("done"));
        assert_eq!(config.from_list_id, None);
    }

    #[test]
    fn unknown_trigger_type_is_a_construction_error() {
        let err = serde_json::from_value::<AutomationRule>(json!({
            "id": Uuid::new_v4(),
            "boardId": "b1",
            "name": "x",
            "enabled": true,
            "triggerType": "card_teleported",
            "createdById": "u1",
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        }));
        assert!(err.is_err());
    }

    #[test]
    fn capacity_respects_max_executions() {
        let mut rule = AutomationRule::new("b1", "capped", TriggerType::CardCreated, "u1")
            .with_max_executions(2);
        assert!(rule.has_capacity());
        rule.execution_count = 2;
        assert!(!rule.has_capacity());

        rule.max_executions = None;
        assert!(rule.has_capacity());
    }
}
