//! Trigger matching: which rules are candidates for an event, and in what
//! order they run.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Duration;
use tracing::debug;

use crate::error::EngineError;
use crate::models::{AutomationRule, TriggerConfig, TriggerEvent, TriggerType};
use crate::store::RuleStore;

/// Window used by `due_date_approaching` when neither `daysBeforeDue` nor
/// `hoursBeforeDue` is set.
const DEFAULT_DUE_WINDOW_HOURS: i64 = 24;

/// Ten years; larger windows are clamped.
const MAX_DUE_WINDOW_HOURS: i64 = 24 * 3650;

pub struct TriggerMatcher {
    rules: Arc<dyn RuleStore>,
}

impl TriggerMatcher {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }

    /// Enabled rules of the event's board whose trigger matches the event
    /// and whose execution cap is not exhausted, in execution order.
    pub async fn candidates(&self, event: &TriggerEvent) -> Result<Vec<AutomationRule>, EngineError> {
        let mut rules = self.rules.enabled_rules_for_board(&event.board_id).await?;
        let fetched = rules.len();
        rules.retain(|rule| is_candidate(rule, event));
        sort_candidates(&mut rules);
        debug!(
            board_id = %event.board_id,
            event = %event.event_type,
            fetched,
            candidates = rules.len(),
            "matched rules"
        );
        Ok(rules)
    }
}

pub fn is_candidate(rule: &AutomationRule, event: &TriggerEvent) -> bool {
    rule.enabled
        && rule.board_id == event.board_id
        && rule.trigger_type == event.event_type
        && rule.has_capacity()
        && matches_trigger_config(&rule.trigger_config, event)
}

/// Priority descending, then oldest first, then by id for a total order.
pub fn sort_candidates(rules: &mut [AutomationRule]) {
    rules.sort_by(execution_order);
}

fn execution_order(a: &AutomationRule, b: &AutomationRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Apply the trigger-specific filters.  Unset config fields match anything.
pub fn matches_trigger_config(config: &TriggerConfig, event: &TriggerEvent) -> bool {
    let ctx = &event.context;
    match event.event_type {
        TriggerType::CardMoved => {
            wildcard_eq(&config.from_list_id, ctx.from_list_id.as_deref())
                && wildcard_eq(&config.to_list_id, ctx.to_list_id.as_deref())
        }
        TriggerType::CardCreated => {
            let created_in = ctx
                .to_list_id
                .as_deref()
                .or_else(|| ctx.task.as_ref().map(|t| t.list_id.as_str()));
            wildcard_eq(&config.to_list_id, created_in)
        }
        TriggerType::DueDateApproaching => {
            let Some(due) = ctx.task.as_ref().and_then(|t| t.due_date) else {
                return false;
            };
            let window = due_window(config);
            due > event.occurred_at && due <= event.occurred_at + window
        }
        TriggerType::DueDatePassed => ctx
            .task
            .as_ref()
            .and_then(|t| t.due_date)
            .is_some_and(|due| due <= event.occurred_at),
        TriggerType::ChecklistCompleted | TriggerType::ChecklistItemChecked => wildcard_eq(
            &config.checklist_name,
            ctx.checklist.as_ref().map(|c| c.name.as_str()),
        ),
        TriggerType::CommentMention => match &config.member_id {
            None => true,
            Some(member) => ctx.mentioned_user_ids.iter().any(|id| id == member),
        },
        TriggerType::LabelAdded | TriggerType::LabelRemoved => {
            let label = ctx.label.as_ref();
            match (&config.label_id, &config.label_name) {
                (Some(id), _) => label.is_some_and(|l| &l.id == id),
                (None, Some(name)) => label.is_some_and(|l| &l.name == name),
                (None, None) => true,
            }
        }
        TriggerType::MemberAssigned | TriggerType::MemberUnassigned => wildcard_eq(
            &config.member_id,
            ctx.member.as_ref().map(|m| m.user_id.as_str()),
        ),
        TriggerType::WebhookReceived => wildcard_eq(&config.webhook_id, ctx.webhook_id.as_deref()),
        TriggerType::Scheduled => wildcard_eq(&config.cron_expression, ctx.schedule.as_deref()),
        TriggerType::CardUpdated
        | TriggerType::CommentAdded
        | TriggerType::AttachmentAdded => true,
    }
}

fn due_window(config: &TriggerConfig) -> Duration {
    match (config.days_before_due, config.hours_before_due) {
        (None, None) => Duration::hours(DEFAULT_DUE_WINDOW_HOURS),
        (days, hours) => {
            let total = days
                .unwrap_or(0)
                .saturating_mul(24)
                .saturating_add(hours.unwrap_or(0));
            Duration::hours(total.clamp(0, MAX_DUE_WINDOW_HOURS))
        }
    }
}

fn wildcard_eq(expected: &Option<String>, actual: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => actual == Some(expected.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActionConfig, ChecklistRef, EventContext};
    use crate::store::MemoryStore;
    use board::{Card, Label, Member};
    use chrono::{TimeZone, Utc};

    fn rule(board: &str, trigger: TriggerType) -> AutomationRule {
        AutomationRule::new(board, "r", trigger, "u1").with_action(ActionConfig::ArchiveCard {})
    }

    fn moved(to: &str) -> TriggerEvent {
        TriggerEvent::new(
            TriggerType::CardMoved,
            "b1",
            EventContext::for_card(Card::new("c1", "b1", to, "t")).moved("todo", to),
        )
    }

    fn to_list(list: &str) -> TriggerConfig {
        TriggerConfig {
            to_list_id: Some(list.into()),
            ..TriggerConfig::default()
        }
    }

    #[tokio::test]
    async fn candidates_are_filtered_and_ordered() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut low_old = rule("b1", TriggerType::CardMoved).with_priority(1);
        low_old.created_at = t0;
        let mut high = rule("b1", TriggerType::CardMoved).with_priority(5);
        high.created_at = t0 + Duration::days(2);
        let mut low_new = rule("b1", TriggerType::CardMoved).with_priority(1);
        low_new.created_at = t0 + Duration::days(1);
        let mut disabled = rule("b1", TriggerType::CardMoved);
        disabled.enabled = false;
        let other_board = rule("b2", TriggerType::CardMoved);
        let other_type = rule("b1", TriggerType::CardCreated);
        let mut exhausted = rule("b1", TriggerType::CardMoved).with_max_executions(3);
        exhausted.execution_count = 3;

        for r in [&low_new, &disabled, &high, &other_board, &other_type, &low_old, &exhausted] {
            store.insert_rule(r).await.unwrap();
        }

        let matcher = TriggerMatcher::new(store);
        let ids: Vec<_> = matcher
            .candidates(&moved("done"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();

        assert_eq!(ids, vec![high.id, low_old.id, low_new.id]);
    }

    #[test]
    fn destination_filter_only_matches_its_list() {
        let mut filtered = rule("b1", TriggerType::CardMoved).with_trigger_config(to_list("done"));
        let open = rule("b1", TriggerType::CardMoved);

        assert!(is_candidate(&filtered, &moved("done")));
        assert!(!is_candidate(&filtered, &moved("review")));
        assert!(is_candidate(&open, &moved("review")));

        filtered.trigger_config.from_list_id = Some("backlog".into());
        assert!(!is_candidate(&filtered, &moved("done")));
    }

    #[test]
    fn created_cards_match_on_their_list() {
        let r = rule("b1", TriggerType::CardCreated).with_trigger_config(to_list("inbox"));
        let event = |list: &str| {
            TriggerEvent::new(
                TriggerType::CardCreated,
                "b1",
                EventContext::for_card(Card::new("c1", "b1", list, "t")),
            )
        };
        assert!(is_candidate(&r, &event("inbox")));
        assert!(!is_candidate(&r, &event("backlog")));
    }

    #[test]
    fn due_window_uses_days_and_hours() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let r = rule("b1", TriggerType::DueDateApproaching).with_trigger_config(TriggerConfig {
            days_before_due: Some(2),
            ..TriggerConfig::default()
        });
        let event = |due_in: Duration| {
            let mut card = Card::new("c1", "b1", "todo", "t");
            card.due_date = Some(now + due_in);
            TriggerEvent::new(TriggerType::DueDateApproaching, "b1", EventContext::for_card(card))
                .at(now)
        };

        assert!(is_candidate(&r, &event(Duration::days(1) + Duration::hours(20))));
        assert!(is_candidate(&r, &event(Duration::days(2))));
        assert!(!is_candidate(&r, &event(Duration::days(3))));
        assert!(!is_candidate(&r, &event(-Duration::hours(1))));
    }

    #[test]
    fn due_window_defaults_to_a_day() {
        let now = Utc::now();
        let r = rule("b1", TriggerType::DueDateApproaching);
        let event = |due_in: Duration| {
            let mut card = Card::new("c1", "b1", "todo", "t");
            card.due_date = Some(now + due_in);
            TriggerEvent::new(TriggerType::DueDateApproaching, "b1", EventContext::for_card(card))
                .at(now)
        };
        assert!(is_candidate(&r, &event(Duration::hours(23))));
        assert!(!is_candidate(&r, &event(Duration::hours(25))));

        let no_due = TriggerEvent::new(
            TriggerType::DueDateApproaching,
            "b1",
            EventContext::for_card(Card::new("c1", "b1", "todo", "t")),
        );
        assert!(!is_candidate(&r, &no_due));
    }

    #[test]
    fn overdue_cards_match_due_date_passed() {
        let now = Utc::now();
        let r = rule("b1", TriggerType::DueDatePassed);
        let mut card = Card::new("c1", "b1", "todo", "t");
        card.due_date = Some(now - Duration::minutes(5));
        let event =
            TriggerEvent::new(TriggerType::DueDatePassed, "b1", EventContext::for_card(card)).at(now);
        assert!(is_candidate(&r, &event));
    }

    #[test]
    fn label_filter_prefers_id_over_name() {
        let by_id = rule("b1", TriggerType::LabelAdded).with_trigger_config(TriggerConfig {
            label_id: Some("l1".into()),
            label_name: Some("Other".into()),
            ..TriggerConfig::default()
        });
        let by_name = rule("b1", TriggerType::LabelAdded).with_trigger_config(TriggerConfig {
            label_name: Some("Bug".into()),
            ..TriggerConfig::default()
        });
        let event = TriggerEvent::new(
            TriggerType::LabelAdded,
            "b1",
            EventContext {
                label: Some(Label { id: "l1".into(), name: "Bug".into(), color: None }),
                ..EventContext::default()
            },
        );
        assert!(is_candidate(&by_id, &event));
        assert!(is_candidate(&by_name, &event));
    }

    #[test]
    fn mention_checklist_member_webhook_and_schedule_filters() {
        let ctx = EventContext {
            mentioned_user_ids: vec!["u7".into()],
            checklist: Some(ChecklistRef { id: None, name: "Release".into() }),
            member: Some(Member { user_id: "u3".into(), name: "Sam".into() }),
            webhook_id: Some("w1".into()),
            schedule: Some("0 9 * * 1".into()),
            ..EventContext::default()
        };
        let cases = [
            (TriggerType::CommentMention, TriggerConfig { member_id: Some("u7".into()), ..Default::default() }, true),
            (TriggerType::CommentMention, TriggerConfig { member_id: Some("u8".into()), ..Default::default() }, false),
            (TriggerType::ChecklistCompleted, TriggerConfig { checklist_name: Some("Release".into()), ..Default::default() }, true),
            (TriggerType::ChecklistItemChecked, TriggerConfig { checklist_name: Some("QA".into()), ..Default::default() }, false),
            (TriggerType::MemberAssigned, TriggerConfig { member_id: Some("u3".into()), ..Default::default() }, true),
            (TriggerType::WebhookReceived, TriggerConfig { webhook_id: Some("w2".into()), ..Default::default() }, false),
            (TriggerType::Scheduled, TriggerConfig { cron_expression: Some("0 9 * * 1".into()), ..Default::default() }, true),
        ];

        for (trigger, config, expected) in cases {
            let r = rule("b1", trigger).with_trigger_config(config);
            let event = TriggerEvent::new(trigger, "b1", ctx.clone());
            assert_eq!(is_candidate(&r, &event), expected, "{trigger}");
        }
    }

    #[test]
    fn irrelevant_config_fields_are_ignored() {
        let r = rule("b1", TriggerType::CommentAdded).with_trigger_config(to_list("done"));
        let event = TriggerEvent::new(TriggerType::CommentAdded, "b1", EventContext::default());
        assert!(is_candidate(&r, &event));
    }
}
