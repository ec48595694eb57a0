//! Snapshots of board entities exchanged with the board application.
//!
//! These mirror the JSON the board application produces, so field names
//! are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// A card (task) as seen at the time of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub board_id: String,
    pub list_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub assignee_id: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, rename = "taskLabels")]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub archived: bool,
    /// User who created the card.
    #[serde(default)]
    pub creator_id: Option<String>,
}

impl Card {
    /// Minimal card used by tests and by webhook payloads that only carry ids.
    pub fn new(
        id: impl Into<String>,
        board_id: impl Into<String>,
        list_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            board_id: board_id.into(),
            list_id: list_id.into(),
            title: title.into(),
            description: None,
            assignee_id: None,
            due_date: None,
            labels: Vec::new(),
            archived: false,
            creator_id: None,
        }
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.labels.iter().any(|l| l.id == label_id)
    }
}

// ---------------------------------------------------------------------------
// Lists, labels, members
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardList {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// A board member.  Also used for the acting user of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub user_id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Checklists and notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub id: String,
    pub card_id: String,
    pub name: String,
    pub items: Vec<String>,
    #[serde(default)]
    pub completed: bool,
}

/// An in-app notification addressed to a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: String,
    #[serde(default)]
    pub card_id: Option<String>,
    pub title: String,
    pub message: String,
}
