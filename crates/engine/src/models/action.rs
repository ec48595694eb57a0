//! Action configurations.  One variant per action type; the executor in
//! [`crate::executor`] turns each into board calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single side effect a rule (or inbound webhook) performs when it fires.
///
/// String fields support `{{placeholder}}` interpolation where noted in the
/// executor.  Unknown keys are ignored so older clients keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ActionConfig {
    MoveCard {
        target_list_id: String,
    },
    /// Precedence: `user_id`, then `assign_creator`, then `assign_random`.
    AssignMember {
        #[serde(default)]
        user_id: Option<String>,
        #[serde(default)]
        assign_creator: bool,
        #[serde(default)]
        assign_random: bool,
    },
    /// Without `user_id` the card's current assignee is removed.
    UnassignMember {
        #[serde(default)]
        user_id: Option<String>,
    },
    AddLabel {
        #[serde(default)]
        label_id: Option<String>,
        #[serde(default)]
        label_name: Option<String>,
        #[serde(default)]
        label_color: Option<String>,
        #[serde(default)]
        create_if_missing: bool,
    },
    RemoveLabel {
        #[serde(default)]
        label_id: Option<String>,
        #[serde(default)]
        label_name: Option<String>,
    },
    AddComment {
        content: String,
    },
    /// Without `user_id` the card's assignee is notified.
    SendNotification {
        message: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        user_id: Option<String>,
    },
    SendWebhook {
        webhook_url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        webhook_payload: Option<Value>,
        #[serde(default)]
        headers: BTreeMap<String, String>,
    },
    /// Due date = now + `due_date_offset` days, optionally pinned to an hour
    /// of the day (UTC).
    SetDueDate {
        due_date_offset: i64,
        #[serde(default)]
        due_date_hour: Option<u32>,
    },
    ArchiveCard {},
    CopyCard {
        #[serde(default)]
        target_list_id: Option<String>,
        #[serde(default)]
        copy_title: Option<String>,
    },
    /// `checklist_items` is newline-separated; blank lines are dropped.
    CreateChecklist {
        checklist_name: String,
        #[serde(default)]
        checklist_items: String,
    },
    /// Without `checklist_name` every checklist on the card is completed.
    MarkChecklistComplete {
        #[serde(default)]
        checklist_name: Option<String>,
    },
}

impl ActionConfig {
    /// The wire tag of this action (`"move_card"`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MoveCard { .. } => "move_card",
            Self::AssignMember { .. } => "assign_member",
            Self::UnassignMember { .. } => "unassign_member",
            Self::AddLabel { .. } => "add_label",
            Self::RemoveLabel { .. } => "remove_label",
            Self::AddComment { .. } => "add_comment",
            Self::SendNotification { .. } => "send_notification",
            Self::SendWebhook { .. } => "send_webhook",
            Self::SetDueDate { .. } => "set_due_date",
            Self::ArchiveCard {} => "archive_card",
            Self::CopyCard { .. } => "copy_card",
            Self::CreateChecklist { .. } => "create_checklist",
            Self::MarkChecklistComplete { .. } => "mark_checklist_complete",
        }
    }

    /// Shorthand used throughout tests and the template catalog.
    pub fn move_to(list_id: impl Into<String>) -> Self {
        Self::MoveCard {
            target_list_id: list_id.into(),
        }
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Self::AddComment {
            content: content.into(),
        }
    }

    pub fn label_by_name(name: impl Into<String>, color: Option<&str>) -> Self {
        Self::AddLabel {
            label_id: None,
            label_name: Some(name.into()),
            label_color: color.map(str::to_owned),
            create_if_missing: true,
        }
    }
}

/// HTTP verb for `send_webhook`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[serde(alias = "get")]
    Get,
    #[default]
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
}
