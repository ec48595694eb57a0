//! Trigger events and the context they carry through a pipeline.

use board::{BoardList, Card, Label, Member};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::TriggerType;

/// A domain or external event submitted to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    #[serde(rename = "type")]
    pub event_type: TriggerType,
    pub board_id: String,
    #[serde(default = "Utc::now")]
    pub occurred_at: DateTime<Utc>,
    #[serde(default)]
    pub context: EventContext,
}

impl TriggerEvent {
    pub fn new(event_type: TriggerType, board_id: impl Into<String>, context: EventContext) -> Self {
        Self {
            event_type,
            board_id: board_id.into(),
            occurred_at: Utc::now(),
            context,
        }
    }

    /// Override the event time.  Due-date triggers measure against it.
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}

/// Entity snapshots attached to an event.  Actions update it in place, so
/// later actions in the same rule see earlier effects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list: Option<BoardList>,
    /// The acting user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_list_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_list_id: Option<String>,
    /// Label added or removed by `label_*` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    /// Member assigned or unassigned by `member_*` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checklist: Option<ChecklistRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mentioned_user_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_id: Option<String>,
    /// Cron expression of the schedule that produced a `scheduled` event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    /// Inbound webhook body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl EventContext {
    pub fn for_card(card: Card) -> Self {
        Self {
            task: Some(card),
            ..Self::default()
        }
    }

    pub fn with_list(mut self, list: BoardList) -> Self {
        self.list = Some(list);
        self
    }

    pub fn with_user(mut self, user: Member) -> Self {
        self.user = Some(user);
        self
    }

    pub fn moved(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.from_list_id = Some(from.into());
        self.to_list_id = Some(to.into());
        self
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task.as_ref().map(|t| t.id.as_str())
    }
}

/// The checklist a `checklist_*` event refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistRef {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
}
