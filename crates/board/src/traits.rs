//! The collaborator traits the action executor dispatches through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{BoardError, BoardList, Card, Checklist, Label, Member, Notification};

/// Board mutations and lookups available to automation actions.
///
/// Implementations must be safe to call from many concurrent event
/// pipelines; the engine applies no locking of its own.
#[async_trait]
pub trait BoardService: Send + Sync {
    /// Fetch the current snapshot of a card.
    async fn get_card(&self, card_id: &str) -> Result<Card, BoardError>;

    /// Move a card to the end of `list_id` and return the target list.
    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<BoardList, BoardError>;

    async fn board_members(&self, board_id: &str) -> Result<Vec<Member>, BoardError>;

    async fn assign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError>;

    async fn unassign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError>;

    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, BoardError>;

    async fn create_label(
        &self,
        board_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<Label, BoardError>;

    /// Attach an existing board label to a card.  Attaching twice is a no-op.
    async fn attach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError>;

    async fn detach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError>;

    async fn add_comment(
        &self,
        card_id: &str,
        author_id: Option<&str>,
        content: &str,
    ) -> Result<(), BoardError>;

    async fn set_due_date(&self, card_id: &str, due: DateTime<Utc>) -> Result<(), BoardError>;

    async fn archive_card(&self, card_id: &str) -> Result<(), BoardError>;

    /// Copy a card into `list_id` under a new title; returns the new card.
    async fn copy_card(
        &self,
        card_id: &str,
        list_id: &str,
        title: &str,
    ) -> Result<Card, BoardError>;

    async fn create_checklist(
        &self,
        card_id: &str,
        name: &str,
        items: &[String],
    ) -> Result<Checklist, BoardError>;

    /// Mark checklists on a card complete.  `name = None` completes all of
    /// them.  Returns how many checklists were completed.
    async fn complete_checklists(
        &self,
        card_id: &str,
        name: Option<&str>,
    ) -> Result<usize, BoardError>;
}

/// Delivery of in-app notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), BoardError>;
}
