//! Action execution: turns [`ActionConfig`]s into board calls.
//!
//! Actions run strictly in order.  A failing action is recorded and the
//! next one still runs; there are no retries.  Each successful action writes
//! its effect back into the [`EventContext`] so later actions (and later
//! rules handling the same event) observe the new card state.

use std::sync::Arc;

use board::{BoardError, BoardService, Card, Label, Member, Notification, Notifier};
use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::interpolate::{interpolate, interpolate_json};
use crate::models::{ActionConfig, ActionOutcome, ActionStatus, EventContext, HttpMethod};
use crate::outbound::{OutboundError, OutboundRequest, WebhookSender};

/// Hundred years either way; larger due-date offsets are clamped.
const MAX_DUE_OFFSET_DAYS: i64 = 36_500;

const DEFAULT_NOTIFICATION_TITLE: &str = "Automation";

/// Why a single action failed.  Recorded in the log, never propagated.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no card in the event context")]
    MissingCard,

    /// A required field was blank at run time (e.g. an unfilled template
    /// placeholder).
    #[error("'{0}' is not set")]
    MissingField(&'static str),

    #[error("no board member to assign")]
    NoMember,

    #[error("card has no assignee to remove")]
    NoAssignee,

    #[error("label '{0}' not found on the board")]
    LabelNotFound(String),

    #[error("no notification recipient")]
    NoRecipient,

    #[error("outbound webhook failed: {0}")]
    Webhook(#[from] OutboundError),

    #[error("board call failed: {0}")]
    Board(#[from] BoardError),
}

/// Dispatches actions to the board, the notifier and the outbound sender.
pub struct ActionExecutor {
    board: Arc<dyn BoardService>,
    notifier: Arc<dyn Notifier>,
    sender: Arc<dyn WebhookSender>,
}

impl ActionExecutor {
    pub fn new(
        board: Arc<dyn BoardService>,
        notifier: Arc<dyn Notifier>,
        sender: Arc<dyn WebhookSender>,
    ) -> Self {
        Self {
            board,
            notifier,
            sender,
        }
    }

    /// The board client actions run against.
    pub fn board(&self) -> &Arc<dyn BoardService> {
        &self.board
    }

    /// Run every action in order and report one outcome per action.
    #[instrument(skip(self, actions, context), fields(actions = actions.len()))]
    pub async fn execute_all(
        &self,
        board_id: &str,
        actions: &[ActionConfig],
        context: &mut EventContext,
    ) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::with_capacity(actions.len());
        for (index, action) in actions.iter().enumerate() {
            let outcome = match self.execute(board_id, action, context).await {
                Ok(()) => {
                    debug!(index, action = action.kind(), "action succeeded");
                    ActionOutcome {
                        index,
                        action: action.kind().to_owned(),
                        status: ActionStatus::Success,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(index, action = action.kind(), error = %e, "action failed");
                    ActionOutcome {
                        index,
                        action: action.kind().to_owned(),
                        status: ActionStatus::Failed,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Run a single action.
    pub async fn execute(
        &self,
        board_id: &str,
        action: &ActionConfig,
        context: &mut EventContext,
    ) -> Result<(), ActionError> {
        match action {
            ActionConfig::MoveCard { target_list_id } => {
                let target = non_blank(target_list_id).ok_or(ActionError::MissingField("targetListId"))?;
                let card_id = card(context)?.id.clone();
                let list = self.board.move_card(&card_id, target).await?;
                if let Some(task) = context.task.as_mut() {
                    task.list_id = list.id.clone();
                }
                context.list = Some(list);
            }

            ActionConfig::AssignMember {
                user_id,
                assign_creator,
                assign_random,
            } => {
                let card_id = card(context)?.id.clone();
                let members = self.board.board_members(board_id).await?;

                let chosen = if let Some(user) = user_id.as_deref().and_then(non_blank) {
                    Some(user.to_owned())
                } else if *assign_creator {
                    card(context)?
                        .creator_id
                        .clone()
                        .or_else(|| context.user.as_ref().map(|u| u.user_id.clone()))
                } else if *assign_random {
                    random_member(&members)
                } else {
                    None
                };

                let user = chosen
                    .filter(|id| members.iter().any(|m| &m.user_id == id))
                    .ok_or(ActionError::NoMember)?;
                self.board.assign_member(&card_id, &user).await?;
                if let Some(task) = context.task.as_mut() {
                    task.assignee_id = Some(user);
                }
            }

            ActionConfig::UnassignMember { user_id } => {
                let task = card(context)?;
                let user = user_id
                    .as_deref()
                    .and_then(non_blank)
                    .map(str::to_owned)
                    .or_else(|| task.assignee_id.clone())
                    .ok_or(ActionError::NoAssignee)?;
                let card_id = task.id.clone();
                self.board.unassign_member(&card_id, &user).await?;
                if let Some(task) = context.task.as_mut() {
                    if task.assignee_id.as_deref() == Some(user.as_str()) {
                        task.assignee_id = None;
                    }
                }
            }

            ActionConfig::AddLabel {
                label_id,
                label_name,
                label_color,
                create_if_missing,
            } => {
                let card_id = card(context)?.id.clone();
                let labels = self.board.board_labels(board_id).await?;
                let label = match find_label(&labels, label_id.as_deref(), label_name.as_deref()) {
                    Some(label) => label.clone(),
                    None => match label_name.as_deref().and_then(non_blank) {
                        Some(name) if *create_if_missing => {
                            debug!(name, "creating missing label");
                            self.board
                                .create_label(board_id, name, label_color.as_deref())
                                .await?
                        }
                        _ => return Err(ActionError::LabelNotFound(describe_label(label_id, label_name))),
                    },
                };
                self.board.attach_label(&card_id, &label.id).await?;
                if let Some(task) = context.task.as_mut() {
                    if !task.has_label(&label.id) {
                        task.labels.push(label.clone());
                    }
                }
                context.label = Some(label);
            }

            ActionConfig::RemoveLabel {
                label_id,
                label_name,
            } => {
                let task = card(context)?;
                let card_id = task.id.clone();
                let on_card = find_label(&task.labels, label_id.as_deref(), label_name.as_deref()).cloned();
                let label = match on_card {
                    Some(label) => label,
                    None => {
                        let labels = self.board.board_labels(board_id).await?;
                        find_label(&labels, label_id.as_deref(), label_name.as_deref())
                            .cloned()
                            .ok_or_else(|| ActionError::LabelNotFound(describe_label(label_id, label_name)))?
                    }
                };
                self.board.detach_label(&card_id, &label.id).await?;
                if let Some(task) = context.task.as_mut() {
                    task.labels.retain(|l| l.id != label.id);
                }
            }

            ActionConfig::AddComment { content } => {
                let card_id = card(context)?.id.clone();
                let text = interpolate(content, context);
                self.board.add_comment(&card_id, None, &text).await?;
            }

            ActionConfig::SendNotification {
                message,
                title,
                user_id,
            } => {
                let recipient = user_id
                    .as_deref()
                    .and_then(non_blank)
                    .map(str::to_owned)
                    .or_else(|| context.task.as_ref().and_then(|t| t.assignee_id.clone()))
                    .ok_or(ActionError::NoRecipient)?;
                let notification = Notification {
                    user_id: recipient,
                    card_id: context.task_id().map(str::to_owned),
                    title: title
                        .as_deref()
                        .map(|t| interpolate(t, context))
                        .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_owned()),
                    message: interpolate(message, context),
                };
                self.notifier.notify(&notification).await?;
            }

            ActionConfig::SendWebhook {
                webhook_url,
                method,
                webhook_payload,
                headers,
            } => {
                let url = non_blank(webhook_url).ok_or(ActionError::MissingField("webhookUrl"))?;
                let body = match method {
                    HttpMethod::Get => None,
                    HttpMethod::Post | HttpMethod::Put => Some(match webhook_payload {
                        Some(template) => interpolate_json(template, context),
                        None => default_payload(board_id, context),
                    }),
                };
                let request = OutboundRequest {
                    method: *method,
                    url: url.to_owned(),
                    headers: headers.clone(),
                    body,
                };
                self.sender.send(&request).await?;
            }

            ActionConfig::SetDueDate {
                due_date_offset,
                due_date_hour,
            } => {
                let card_id = card(context)?.id.clone();
                let due = due_date_from(Utc::now(), *due_date_offset, *due_date_hour);
                self.board.set_due_date(&card_id, due).await?;
                if let Some(task) = context.task.as_mut() {
                    task.due_date = Some(due);
                }
            }

            ActionConfig::ArchiveCard {} => {
                let card_id = card(context)?.id.clone();
                self.board.archive_card(&card_id).await?;
                if let Some(task) = context.task.as_mut() {
                    task.archived = true;
                }
            }

            ActionConfig::CopyCard {
                target_list_id,
                copy_title,
            } => {
                let task = card(context)?;
                let list = target_list_id
                    .as_deref()
                    .and_then(non_blank)
                    .unwrap_or(task.list_id.as_str())
                    .to_owned();
                let title = match copy_title.as_deref().and_then(non_blank) {
                    Some(template) => interpolate(template, context),
                    None => task.title.clone(),
                };
                let card_id = task.id.clone();
                let copy = self.board.copy_card(&card_id, &list, &title).await?;
                debug!(source = %card_id, copy = %copy.id, "card copied");
            }

            ActionConfig::CreateChecklist {
                checklist_name,
                checklist_items,
            } => {
                let card_id = card(context)?.id.clone();
                let name = non_blank(checklist_name).ok_or(ActionError::MissingField("checklistName"))?;
                let name = interpolate(name, context);
                let items: Vec<String> = checklist_items
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(|line| interpolate(line, context))
                    .collect();
                self.board.create_checklist(&card_id, &name, &items).await?;
            }

            ActionConfig::MarkChecklistComplete { checklist_name } => {
                let card_id = card(context)?.id.clone();
                let name = checklist_name.as_deref().and_then(non_blank);
                let completed = self.board.complete_checklists(&card_id, name).await?;
                debug!(completed, "checklists completed");
            }
        }
        Ok(())
    }
}

fn card(context: &EventContext) -> Result<&Card, ActionError> {
    context.task.as_ref().ok_or(ActionError::MissingCard)
}

fn random_member(members: &[Member]) -> Option<String> {
    members
        .choose(&mut rand::thread_rng())
        .map(|m| m.user_id.clone())
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// By id when an id is configured, otherwise by name.
fn find_label<'a>(labels: &'a [Label], id: Option<&str>, name: Option<&str>) -> Option<&'a Label> {
    match (id.and_then(non_blank), name.and_then(non_blank)) {
        (Some(id), _) => labels.iter().find(|l| l.id == id),
        (None, Some(name)) => labels.iter().find(|l| l.name == name),
        (None, None) => None,
    }
}

fn describe_label(id: &Option<String>, name: &Option<String>) -> String {
    id.clone().or_else(|| name.clone()).unwrap_or_default()
}

/// `now + offset` days; with an hour, pinned to `hour:00:00` UTC that day.
pub fn due_date_from(now: DateTime<Utc>, offset_days: i64, hour: Option<u32>) -> DateTime<Utc> {
    let due = now + Duration::days(offset_days.clamp(-MAX_DUE_OFFSET_DAYS, MAX_DUE_OFFSET_DAYS));
    hour.and_then(|h| due.date_naive().and_hms_opt(h, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(due)
}

/// Body sent when a POST/PUT webhook has no payload template.
fn default_payload(board_id: &str, context: &EventContext) -> serde_json::Value {
    serde_json::json!({
        "boardId": board_id,
        "task": context.task,
        "list": context.list,
        "user": context.user,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use board::mock::MemoryBoard;
    use board::BoardList;
    use chrono::{TimeZone, Timelike};
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Records requests instead of sending them.
    #[derive(Default)]
    struct RecordingSender {
        requests: Mutex<Vec<OutboundRequest>>,
        fail_with: Option<OutboundError>,
    }

    #[async_trait]
    impl WebhookSender for RecordingSender {
        async fn send(&self, request: &OutboundRequest) -> Result<u16, OutboundError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.fail_with {
                Some(e) => Err(e.clone()),
                None => Ok(200),
            }
        }
    }

    fn board() -> Arc<MemoryBoard> {
        let mut card = Card::new("c1", "b1", "todo", "Fix login");
        card.creator_id = Some("u1".into());
        Arc::new(
            MemoryBoard::new()
                .with_list("b1", "todo", "To Do")
                .with_list("b1", "done", "Done")
                .with_member("b1", "u1", "Ada")
                .with_member("b1", "u2", "Grace")
                .with_label("b1", "l1", "Bug")
                .with_card(card),
        )
    }

    fn setup() -> (Arc<MemoryBoard>, Arc<RecordingSender>, ActionExecutor) {
        let board = board();
        let sender = Arc::new(RecordingSender::default());
        let exec = ActionExecutor::new(board.clone(), board.clone(), sender.clone());
        (board, sender, exec)
    }

    fn context(board: &MemoryBoard) -> EventContext {
        EventContext::for_card(board.card("c1").unwrap())
            .with_user(Member { user_id: "u2".into(), name: "Grace".into() })
            .with_list(BoardList { id: "todo".into(), name: "To Do".into() })
    }

    #[tokio::test]
    async fn move_updates_board_and_context() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);

        exec.execute("b1", &ActionConfig::move_to("done"), &mut ctx).await.unwrap();

        assert_eq!(board.card("c1").unwrap().list_id, "done");
        assert_eq!(board.cards_in_list("done"), vec!["c1"]);
        assert_eq!(ctx.task.unwrap().list_id, "done");
        assert_eq!(ctx.list.unwrap().name, "Done");
    }

    #[tokio::test]
    async fn failing_action_does_not_stop_the_next_one() {
        let (board, _, exec) = setup();
        board.fail_on("move_card");
        let mut ctx = context(&board);

        let outcomes = exec
            .execute_all(
                "b1",
                &[ActionConfig::move_to("done"), ActionConfig::comment("moved by {{user.name}}")],
                &mut ctx,
            )
            .await;

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, ActionStatus::Failed);
        assert!(outcomes[0].error.as_deref().unwrap().contains("move_card"));
        assert_eq!(outcomes[1].status, ActionStatus::Success);
        assert_eq!(board.comments("c1")[0].content, "moved by Grace");
        assert_eq!(ctx.task.unwrap().list_id, "todo");
    }

    #[tokio::test]
    async fn actions_without_a_card_fail() {
        let (_, _, exec) = setup();
        let mut ctx = EventContext::default();
        let err = exec.execute("b1", &ActionConfig::ArchiveCard {}, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingCard));
    }

    #[tokio::test]
    async fn assign_prefers_explicit_user_then_creator() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);

        let explicit = ActionConfig::AssignMember {
            user_id: Some("u2".into()),
            assign_creator: true,
            assign_random: false,
        };
        exec.execute("b1", &explicit, &mut ctx).await.unwrap();
        assert_eq!(board.card("c1").unwrap().assignee_id.as_deref(), Some("u2"));

        let creator = ActionConfig::AssignMember {
            user_id: None,
            assign_creator: true,
            assign_random: false,
        };
        exec.execute("b1", &creator, &mut ctx).await.unwrap();
        assert_eq!(board.card("c1").unwrap().assignee_id.as_deref(), Some("u1"));
        assert_eq!(ctx.task.unwrap().assignee_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn assign_creator_falls_back_to_actor() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        ctx.task.as_mut().unwrap().creator_id = None;

        let creator = ActionConfig::AssignMember {
            user_id: None,
            assign_creator: true,
            assign_random: false,
        };
        exec.execute("b1", &creator, &mut ctx).await.unwrap();
        assert_eq!(board.card("c1").unwrap().assignee_id.as_deref(), Some("u2"));
    }

    #[tokio::test]
    async fn assign_random_picks_a_board_member() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let random = ActionConfig::AssignMember {
            user_id: None,
            assign_creator: false,
            assign_random: true,
        };
        exec.execute("b1", &random, &mut ctx).await.unwrap();

        let assignee = board.card("c1").unwrap().assignee_id.unwrap();
        assert!(assignee == "u1" || assignee == "u2");
    }

    #[tokio::test]
    async fn assigning_a_non_member_fails() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let stranger = ActionConfig::AssignMember {
            user_id: Some("u99".into()),
            assign_creator: false,
            assign_random: false,
        };
        let err = exec.execute("b1", &stranger, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::NoMember));
        assert!(!board.calls().contains(&"assign_member".to_owned()));
    }

    #[tokio::test]
    async fn unassign_defaults_to_current_assignee() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let unassign = ActionConfig::UnassignMember { user_id: None };

        let err = exec.execute("b1", &unassign, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::NoAssignee));

        board.assign_member("c1", "u1").await.unwrap();
        ctx.task.as_mut().unwrap().assignee_id = Some("u1".into());
        exec.execute("b1", &unassign, &mut ctx).await.unwrap();
        assert_eq!(board.card("c1").unwrap().assignee_id, None);
        assert_eq!(ctx.task.unwrap().assignee_id, None);
    }

    #[tokio::test]
    async fn add_label_creates_when_missing() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);

        exec.execute("b1", &ActionConfig::label_by_name("Urgent", Some("red")), &mut ctx)
            .await
            .unwrap();

        let urgent = board.labels("b1").into_iter().find(|l| l.name == "Urgent").unwrap();
        assert_eq!(urgent.color.as_deref(), Some("red"));
        assert!(board.card("c1").unwrap().has_label(&urgent.id));
        assert!(ctx.task.unwrap().has_label(&urgent.id));
    }

    #[tokio::test]
    async fn add_label_without_create_fails_for_unknown_name() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let action = ActionConfig::AddLabel {
            label_id: None,
            label_name: Some("Urgent".into()),
            label_color: None,
            create_if_missing: false,
        };
        let err = exec.execute("b1", &action, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::LabelNotFound(name) if name == "Urgent"));
    }

    #[tokio::test]
    async fn label_id_wins_over_name() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let action = ActionConfig::AddLabel {
            label_id: Some("l1".into()),
            label_name: Some("Something else".into()),
            label_color: None,
            create_if_missing: true,
        };
        exec.execute("b1", &action, &mut ctx).await.unwrap();
        assert!(board.card("c1").unwrap().has_label("l1"));
        assert_eq!(board.labels("b1").len(), 1);

        let remove = ActionConfig::RemoveLabel {
            label_id: None,
            label_name: Some("Bug".into()),
        };
        exec.execute("b1", &remove, &mut ctx).await.unwrap();
        assert!(!board.card("c1").unwrap().has_label("l1"));
        assert!(ctx.task.unwrap().labels.is_empty());
    }

    #[tokio::test]
    async fn notification_goes_to_assignee_by_default() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let notify = ActionConfig::SendNotification {
            message: "'{{task.title}}' is due soon".into(),
            title: None,
            user_id: None,
        };

        let err = exec.execute("b1", &notify, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::NoRecipient));

        ctx.task.as_mut().unwrap().assignee_id = Some("u1".into());
        exec.execute("b1", &notify, &mut ctx).await.unwrap();

        let sent = board.notifications();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, "u1");
        assert_eq!(sent[0].card_id.as_deref(), Some("c1"));
        assert_eq!(sent[0].title, "Automation");
        assert_eq!(sent[0].message, "'Fix login' is due soon");
    }

    #[tokio::test]
    async fn webhook_bodies_are_interpolated_and_get_has_none() {
        let (board, sender, exec) = setup();
        let mut ctx = context(&board);
        let post = ActionConfig::SendWebhook {
            webhook_url: "https://hooks.example.test/in".into(),
            method: HttpMethod::Post,
            webhook_payload: Some(json!({ "text": "{{task.title}} by {{user.name}}", "n": 1 })),
            headers: BTreeMap::from([("x-token".to_owned(), "t".to_owned())]),
        };
        let get = ActionConfig::SendWebhook {
            webhook_url: "https://hooks.example.test/ping".into(),
            method: HttpMethod::Get,
            webhook_payload: Some(json!({ "ignored": true })),
            headers: BTreeMap::new(),
        };

        exec.execute("b1", &post, &mut ctx).await.unwrap();
        exec.execute("b1", &get, &mut ctx).await.unwrap();

        let requests = sender.requests.lock().unwrap();
        assert_eq!(requests[0].body, Some(json!({ "text": "Fix login by Grace", "n": 1 })));
        assert_eq!(requests[0].headers["x-token"], "t");
        assert_eq!(requests[1].method, HttpMethod::Get);
        assert_eq!(requests[1].body, None);
    }

    #[tokio::test]
    async fn webhook_failure_is_an_action_failure() {
        let board = board();
        let sender = Arc::new(RecordingSender {
            fail_with: Some(OutboundError::Status(502)),
            ..RecordingSender::default()
        });
        let exec = ActionExecutor::new(board.clone(), board.clone(), sender);
        let mut ctx = context(&board);
        let post = ActionConfig::SendWebhook {
            webhook_url: "https://hooks.example.test/in".into(),
            method: HttpMethod::Post,
            webhook_payload: None,
            headers: BTreeMap::new(),
        };

        let outcomes = exec.execute_all("b1", &[post], &mut ctx).await;
        assert_eq!(outcomes[0].status, ActionStatus::Failed);
        assert!(outcomes[0].error.as_deref().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn set_due_date_updates_card_and_context() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let action = ActionConfig::SetDueDate {
            due_date_offset: 3,
            due_date_hour: Some(17),
        };
        exec.execute("b1", &action, &mut ctx).await.unwrap();

        let due = board.card("c1").unwrap().due_date.unwrap();
        assert_eq!((due.hour(), due.minute(), due.second()), (17, 0, 0));
        assert_eq!(ctx.task.unwrap().due_date, Some(due));
    }

    #[test]
    fn due_date_math() {
        let now = Utc.with_ymd_and_hms(2024, 3, 30, 22, 45, 12).unwrap();
        assert_eq!(
            due_date_from(now, 2, Some(9)),
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
        );
        assert_eq!(due_date_from(now, 1, None), now + Duration::days(1));
        assert_eq!(due_date_from(now, -1, Some(0)), Utc.with_ymd_and_hms(2024, 3, 29, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn archive_copy_and_checklists() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let actions = [
            ActionConfig::CreateChecklist {
                checklist_name: "Release".into(),
                checklist_items: "build\n\n  tag  \ndeploy {{task.title}}\n".into(),
            },
            ActionConfig::MarkChecklistComplete { checklist_name: None },
            ActionConfig::CopyCard {
                target_list_id: Some("done".into()),
                copy_title: Some("Copy of {{task.title}}".into()),
            },
            ActionConfig::ArchiveCard {},
        ];

        let outcomes = exec.execute_all("b1", &actions, &mut ctx).await;
        assert!(outcomes.iter().all(ActionOutcome::is_success), "{outcomes:?}");

        let checklists = board.checklists("c1");
        assert_eq!(checklists[0].items, vec!["build", "tag", "deploy Fix login"]);
        assert!(checklists[0].completed);

        let copies = board.cards_in_list("done");
        assert_eq!(copies.len(), 1);
        assert_eq!(board.card(&copies[0]).unwrap().title, "Copy of Fix login");

        assert!(board.card("c1").unwrap().archived);
        assert!(ctx.task.unwrap().archived);
    }

    #[tokio::test]
    async fn blank_placeholder_fails_at_run_time() {
        let (board, _, exec) = setup();
        let mut ctx = context(&board);
        let err = exec.execute("b1", &ActionConfig::move_to(" "), &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::MissingField("targetListId")));
        assert!(board.calls().is_empty());
    }
}
