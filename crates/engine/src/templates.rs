//! Built-in rule templates.
//!
//! The catalog is static.  Instantiating a template produces a new,
//! disabled draft rule on a board; the template itself never changes.
//! Usage counts are informational and live in memory only.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;

use crate::error::EngineError;
use crate::models::{
    ActionConfig, AutomationRule, Condition, ConditionField, ConditionOperator, TriggerConfig,
    TriggerType,
};

/// A read-only catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub category: &'static str,
    pub trigger_type: TriggerType,
    pub trigger_config: TriggerConfig,
    pub conditions: Vec<Condition>,
    pub actions: Vec<ActionConfig>,
    pub usage_count: u64,
}

/// Board-specific values applied while instantiating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateOverrides {
    pub name: Option<String>,
    pub priority: Option<i32>,
    /// Fills every blank `targetListId` of `move_card` / `copy_card`.
    pub target_list_id: Option<String>,
    /// Fills a blank `toListId` in the trigger config.
    pub trigger_list_id: Option<String>,
}

static CATALOG: Lazy<Vec<AutomationTemplate>> = Lazy::new(|| {
    vec![
        template(
            "tmpl_assign_creator",
            "Assign the creator",
            "Assign new cards to the member who created them.",
            "assignment",
            TriggerType::CardCreated,
            TriggerConfig::default(),
            vec![],
            vec![ActionConfig::AssignMember {
                user_id: None,
                assign_creator: true,
                assign_random: false,
            }],
        ),
        template(
            "tmpl_urgent_label",
            "Flag urgent cards",
            "Label new cards whose title contains URGENT.",
            "labels",
            TriggerType::CardCreated,
            TriggerConfig::default(),
            vec![Condition::new(
                ConditionField::TaskTitle,
                ConditionOperator::Contains,
                "URGENT",
            )],
            vec![ActionConfig::label_by_name("Urgent", Some("red"))],
        ),
        template(
            "tmpl_overdue_label",
            "Mark overdue cards",
            "Label open cards once their due date has passed.",
            "due_dates",
            TriggerType::DueDatePassed,
            TriggerConfig::default(),
            vec![Condition::new(
                ConditionField::TaskArchived,
                ConditionOperator::Equals,
                false,
            )],
            vec![ActionConfig::label_by_name("Overdue", Some("orange"))],
        ),
        template(
            "tmpl_due_soon_notify",
            "Due soon reminder",
            "Notify the assignee a day before a card is due.",
            "due_dates",
            TriggerType::DueDateApproaching,
            TriggerConfig {
                days_before_due: Some(1),
                ..TriggerConfig::default()
            },
            vec![Condition::unary(
                ConditionField::TaskAssigneeId,
                ConditionOperator::IsNotEmpty,
            )],
            vec![ActionConfig::SendNotification {
                message: "'{{task.title}}' is due {{task.dueDate}}".to_owned(),
                title: Some("Due soon".to_owned()),
                user_id: None,
            }],
        ),
        template(
            "tmpl_checklist_done_move",
            "Move when checklist is done",
            "Move a card once one of its checklists is completed.",
            "workflow",
            TriggerType::ChecklistCompleted,
            TriggerConfig::default(),
            vec![],
            vec![ActionConfig::move_to("")],
        ),
        template(
            "tmpl_done_archive",
            "Archive finished cards",
            "Archive cards as soon as they reach the done list.",
            "workflow",
            TriggerType::CardMoved,
            TriggerConfig::default(),
            vec![],
            vec![ActionConfig::ArchiveCard {}],
        ),
        template(
            "tmpl_welcome_comment",
            "Welcome comment",
            "Leave a short comment on every new card.",
            "collaboration",
            TriggerType::CardCreated,
            TriggerConfig::default(),
            vec![],
            vec![ActionConfig::comment(
                "Thanks {{user.name}}! '{{task.title}}' has been added to {{list.name}}.",
            )],
        ),
    ]
});

#[allow(clippy::too_many_arguments)]
fn template(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    category: &'static str,
    trigger_type: TriggerType,
    trigger_config: TriggerConfig,
    conditions: Vec<Condition>,
    actions: Vec<ActionConfig>,
) -> AutomationTemplate {
    AutomationTemplate {
        id,
        name,
        description,
        category,
        trigger_type,
        trigger_config,
        conditions,
        actions,
        usage_count: 0,
    }
}

#[derive(Debug, Default)]
pub struct TemplateLibrary {
    usage: DashMap<&'static str, u64>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every template with its current usage count.
    pub fn list(&self) -> Vec<AutomationTemplate> {
        CATALOG.iter().map(|t| self.with_usage(t)).collect()
    }

    pub fn get(&self, id: &str) -> Option<AutomationTemplate> {
        CATALOG.iter().find(|t| t.id == id).map(|t| self.with_usage(t))
    }

    /// Build a disabled draft rule from a template.  The caller persists it.
    ///
    /// # Errors
    /// [`EngineError::TemplateNotFound`] for an unknown id.
    pub fn instantiate(
        &self,
        template_id: &str,
        board_id: &str,
        created_by_id: &str,
        overrides: TemplateOverrides,
    ) -> Result<AutomationRule, EngineError> {
        let template = CATALOG
            .iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| EngineError::TemplateNotFound(template_id.to_owned()))?;

        let name = overrides
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| template.name.to_owned());

        let mut rule = AutomationRule::new(board_id, name, template.trigger_type, created_by_id)
            .with_trigger_config(template.trigger_config.clone())
            .with_priority(overrides.priority.unwrap_or(0));
        rule.enabled = false;
        rule.description = Some(template.description.to_owned());
        rule.conditions = template.conditions.clone();
        rule.actions = template
            .actions
            .iter()
            .cloned()
            .map(|action| fill_list_placeholder(action, overrides.target_list_id.as_deref()))
            .collect();
        if rule.trigger_config.to_list_id.is_none() {
            rule.trigger_config.to_list_id = overrides.trigger_list_id;
        }
        rule.template_id = Some(template.id.to_owned());

        *self.usage.entry(template.id).or_insert(0) += 1;
        debug!(template_id, board_id, rule_id = %rule.id, "template instantiated");
        Ok(rule)
    }

    fn with_usage(&self, template: &AutomationTemplate) -> AutomationTemplate {
        let mut t = template.clone();
        t.usage_count = self.usage.get(template.id).map_or(0, |n| *n);
        t
    }
}

fn fill_list_placeholder(action: ActionConfig, list_id: Option<&str>) -> ActionConfig {
    let Some(list_id) = list_id else {
        return action;
    };
    match action {
        ActionConfig::MoveCard { target_list_id } if target_list_id.trim().is_empty() => {
            ActionConfig::move_to(list_id)
        }
        ActionConfig::CopyCard {
            target_list_id,
            copy_title,
        } if target_list_id.as_deref().map_or(true, |id| id.trim().is_empty()) => {
            ActionConfig::CopyCard {
                target_list_id: Some(list_id.to_owned()),
                copy_title,
            }
        }
        other => other,
    }
}
