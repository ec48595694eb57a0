//! `MemoryBoard`: an in-process board implementing [`BoardService`] and
//! [`Notifier`].
//!
//! Useful in unit and integration tests where the real board application is
//! unavailable or irrelevant, and for running the engine locally.  Every call
//! is recorded, and individual operations can be made to fail on demand.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{BoardError, BoardList, BoardService, Card, Checklist, Label, Member, Notification, Notifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub card_id: String,
    pub author_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Default)]
struct BoardState {
    cards: HashMap<String, Card>,
    /// list id → (owning board id, list)
    lists: HashMap<String, (String, BoardList)>,
    /// list id → card ids in display order
    positions: HashMap<String, Vec<String>>,
    members: HashMap<String, Vec<Member>>,
    labels: HashMap<String, Vec<Label>>,
    comments: Vec<Comment>,
    checklists: Vec<Checklist>,
    notifications: Vec<Notification>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
}

/// A whole board kept behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryBoard {
    state: Mutex<BoardState>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub fn with_list(self, board_id: &str, id: &str, name: &str) -> Self {
        {
            let mut state = self.state();
            let list = BoardList {
                id: id.to_owned(),
                name: name.to_owned(),
            };
            state.lists.insert(id.to_owned(), (board_id.to_owned(), list));
            state.positions.entry(id.to_owned()).or_default();
        }
        self
    }

    pub fn with_card(self, card: Card) -> Self {
        {
            let mut state = self.state();
            state
                .positions
                .entry(card.list_id.clone())
                .or_default()
                .push(card.id.clone());
            state.cards.insert(card.id.clone(), card);
        }
        self
    }

    pub fn with_member(self, board_id: &str, user_id: &str, name: &str) -> Self {
        self.state()
            .members
            .entry(board_id.to_owned())
            .or_default()
            .push(Member {
                user_id: user_id.to_owned(),
                name: name.to_owned(),
            });
        self
    }

    pub fn with_label(self, board_id: &str, id: &str, name: &str) -> Self {
        self.state()
            .labels
            .entry(board_id.to_owned())
            .or_default()
            .push(Label {
                id: id.to_owned(),
                name: name.to_owned(),
                color: None,
            });
        self
    }

    /// Make every subsequent call to `operation` (e.g. `"move_card"`) fail
    /// with [`BoardError::Unavailable`].
    pub fn fail_on(&self, operation: &'static str) {
        self.state().failing.insert(operation);
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn card(&self, card_id: &str) -> Option<Card> {
        self.state().cards.get(card_id).cloned()
    }

    pub fn cards_in_list(&self, list_id: &str) -> Vec<String> {
        self.state().positions.get(list_id).cloned().unwrap_or_default()
    }

    pub fn labels(&self, board_id: &str) -> Vec<Label> {
        self.state().labels.get(board_id).cloned().unwrap_or_default()
    }

    pub fn comments(&self, card_id: &str) -> Vec<Comment> {
        self.state()
            .comments
            .iter()
            .filter(|c| c.card_id == card_id)
            .cloned()
            .collect()
    }

    pub fn checklists(&self, card_id: &str) -> Vec<Checklist> {
        self.state()
            .checklists
            .iter()
            .filter(|c| c.card_id == card_id)
            .cloned()
            .collect()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.state().notifications.clone()
    }

    /// Names of every operation invoked, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Record the call and return the locked state, or the injected failure.
    fn begin(&self, operation: &'static str) -> Result<MutexGuard<'_, BoardState>, BoardError> {
        let mut state = self.state();
        state.calls.push(operation.to_owned());
        if state.failing.contains(operation) {
            return Err(BoardError::Unavailable(format!("{operation} failed (injected)")));
        }
        Ok(state)
    }
}

impl BoardState {
    fn card_mut(&mut self, card_id: &str) -> Result<&mut Card, BoardError> {
        self.cards
            .get_mut(card_id)
            .ok_or_else(|| BoardError::not_found("card", card_id))
    }

    fn place(&mut self, card_id: &str, list_id: &str) {
        for ids in self.positions.values_mut() {
            ids.retain(|id| id != card_id);
        }
        self.positions
            .entry(list_id.to_owned())
            .or_default()
            .push(card_id.to_owned());
    }
}

#[async_trait]
impl BoardService for MemoryBoard {
    async fn get_card(&self, card_id: &str) -> Result<Card, BoardError> {
        let mut state = self.begin("get_card")?;
        state.card_mut(card_id).map(|c| c.clone())
    }

    async fn move_card(&self, card_id: &str, list_id: &str) -> Result<BoardList, BoardError> {
        let mut state = self.begin("move_card")?;
        let list = state
            .lists
            .get(list_id)
            .map(|(_, l)| l.clone())
            .ok_or_else(|| BoardError::not_found("list", list_id))?;
        state.card_mut(card_id)?.list_id = list_id.to_owned();
        state.place(card_id, list_id);
        Ok(list)
    }

    async fn board_members(&self, board_id: &str) -> Result<Vec<Member>, BoardError> {
        let state = self.begin("board_members")?;
        Ok(state.members.get(board_id).cloned().unwrap_or_default())
    }

    async fn assign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError> {
        let mut state = self.begin("assign_member")?;
        state.card_mut(card_id)?.assignee_id = Some(user_id.to_owned());
        Ok(())
    }

    async fn unassign_member(&self, card_id: &str, user_id: &str) -> Result<(), BoardError> {
        let mut state = self.begin("unassign_member")?;
        let card = state.card_mut(card_id)?;
        if card.assignee_id.as_deref() == Some(user_id) {
            card.assignee_id = None;
        }
        Ok(())
    }

    async fn board_labels(&self, board_id: &str) -> Result<Vec<Label>, BoardError> {
        let state = self.begin("board_labels")?;
        Ok(state.labels.get(board_id).cloned().unwrap_or_default())
    }

    async fn create_label(
        &self,
        board_id: &str,
        name: &str,
        color: Option<&str>,
    ) -> Result<Label, BoardError> {
        let mut state = self.begin("create_label")?;
        let label = Label {
            id: Uuid::new_v4().to_string(),
            name: name.to_owned(),
            color: color.map(str::to_owned),
        };
        state
            .labels
            .entry(board_id.to_owned())
            .or_default()
            .push(label.clone());
        Ok(label)
    }

    async fn attach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError> {
        let mut state = self.begin("attach_label")?;
        let board_id = state.card_mut(card_id)?.board_id.clone();
        let label = state
            .labels
            .get(&board_id)
            .and_then(|ls| ls.iter().find(|l| l.id == label_id).cloned())
            .ok_or_else(|| BoardError::not_found("label", label_id))?;
        let card = state.card_mut(card_id)?;
        if !card.has_label(label_id) {
            card.labels.push(label);
        }
        Ok(())
    }

    async fn detach_label(&self, card_id: &str, label_id: &str) -> Result<(), BoardError> {
        let mut state = self.begin("detach_label")?;
        state.card_mut(card_id)?.labels.retain(|l| l.id != label_id);
        Ok(())
    }

    async fn add_comment(
        &self,
        card_id: &str,
        author_id: Option<&str>,
        content: &str,
    ) -> Result<(), BoardError> {
        let mut state = self.begin("add_comment")?;
        state.card_mut(card_id)?;
        state.comments.push(Comment {
            card_id: card_id.to_owned(),
            author_id: author_id.map(str::to_owned),
            content: content.to_owned(),
        });
        Ok(())
    }

    async fn set_due_date(&self, card_id: &str, due: DateTime<Utc>) -> Result<(), BoardError> {
        let mut state = self.begin("set_due_date")?;
        state.card_mut(card_id)?.due_date = Some(due);
        Ok(())
    }

    async fn archive_card(&self, card_id: &str) -> Result<(), BoardError> {
        let mut state = self.begin("archive_card")?;
        state.card_mut(card_id)?.archived = true;
        Ok(())
    }

    async fn copy_card(
        &self,
        card_id: &str,
        list_id: &str,
        title: &str,
    ) -> Result<Card, BoardError> {
        let mut state = self.begin("copy_card")?;
        if !state.lists.contains_key(list_id) {
            return Err(BoardError::not_found("list", list_id));
        }
        let mut copy = state.card_mut(card_id)?.clone();
        copy.id = Uuid::new_v4().to_string();
        copy.list_id = list_id.to_owned();
        copy.title = title.to_owned();
        copy.archived = false;
        state.place(&copy.id, list_id);
        state.cards.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    async fn create_checklist(
        &self,
        card_id: &str,
        name: &str,
        items: &[String],
    ) -> Result<Checklist, BoardError> {
        let mut state = self.begin("create_checklist")?;
        state.card_mut(card_id)?;
        let checklist = Checklist {
            id: Uuid::new_v4().to_string(),
            card_id: card_id.to_owned(),
            name: name.to_owned(),
            items: items.to_vec(),
            completed: false,
        };
        state.checklists.push(checklist.clone());
        Ok(checklist)
    }

    async fn complete_checklists(
        &self,
        card_id: &str,
        name: Option<&str>,
    ) -> Result<usize, BoardError> {
        let mut state = self.begin("complete_checklists")?;
        state.card_mut(card_id)?;
        let mut completed = 0;
        for checklist in state.checklists.iter_mut().filter(|c| c.card_id == card_id) {
            if name.map_or(true, |n| checklist.name == n) {
                checklist.completed = true;
                completed += 1;
            }
        }
        if completed == 0 {
            if let Some(n) = name {
                return Err(BoardError::not_found("checklist", n));
            }
        }
        Ok(completed)
    }
}

#[async_trait]
impl Notifier for MemoryBoard {
    async fn notify(&self, notification: &Notification) -> Result<(), BoardError> {
        let mut state = self.begin("notify")?;
        state.notifications.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> MemoryBoard {
        MemoryBoard::new()
            .with_list("b1", "todo", "To Do")
            .with_list("b1", "done", "Done")
            .with_card(Card::new("c1", "b1", "todo", "first"))
            .with_card(Card::new("c2", "b1", "done", "second"))
            .with_label("b1", "l1", "Bug")
    }

    #[tokio::test]
    async fn move_card_appends_to_end_of_target_list() {
        let board = board();
        let list = board.move_card("c1", "done").await.unwrap();

        assert_eq!(list.name, "Done");
        assert_eq!(board.cards_in_list("done"), vec!["c2", "c1"]);
        assert!(board.cards_in_list("todo").is_empty());
        assert_eq!(board.card("c1").unwrap().list_id, "done");
    }

    #[tokio::test]
    async fn attaching_a_label_twice_is_a_no_op() {
        let board = board();
        board.attach_label("c1", "l1").await.unwrap();
        board.attach_label("c1", "l1").await.unwrap();

        assert_eq!(board.card("c1").unwrap().labels.len(), 1);
    }

    #[tokio::test]
    async fn injected_failure_is_reported_and_recorded() {
        let board = board();
        board.fail_on("archive_card");

        let err = board.archive_card("c1").await.unwrap_err();
        assert!(matches!(err, BoardError::Unavailable(_)));
        assert_eq!(board.calls(), vec!["archive_card"]);
        assert!(!board.card("c1").unwrap().archived);
    }

    #[tokio::test]
    async fn completing_an_unknown_checklist_by_name_fails() {
        let board = board();
        board
            .create_checklist("c1", "QA", &["a".into(), "b".into()])
            .await
            .unwrap();

        assert_eq!(board.complete_checklists("c1", None).await.unwrap(), 1);
        assert!(board.complete_checklists("c1", Some("Deploy")).await.is_err());
    }
}
