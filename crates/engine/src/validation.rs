//! Configuration validation: run this before persisting a rule or webhook.
//!
//! Rules enforced:
//! 1. Names must be non-blank.
//! 2. `maxExecutions`, when set, must be positive.
//! 3. An enabled rule (or webhook) must carry at least one action.
//! 4. Every action must carry the fields its type requires.
//!
//! Disabled drafts skip checks 3 and 4 so template copies with placeholder
//! fields can be saved and completed later.

use ipnetwork::IpNetwork;
use std::net::IpAddr;

use crate::error::ConfigurationError;
use crate::models::{ActionConfig, AutomationRule};

/// Validate a rule in its current enabled/disabled state.
///
/// # Errors
/// - [`ConfigurationError::EmptyName`] for a blank name.
/// - [`ConfigurationError::InvalidMaxExecutions`] for a zero or negative cap.
/// - [`ConfigurationError::EmptyActions`] if enabled without actions.
/// - [`ConfigurationError::MissingField`] / [`ConfigurationError::InvalidField`]
///   for an incomplete action of an enabled rule.
pub fn validate_rule(rule: &AutomationRule) -> Result<(), ConfigurationError> {
    if rule.name.trim().is_empty() {
        return Err(ConfigurationError::EmptyName);
    }
    if let Some(max) = rule.max_executions {
        if max <= 0 {
            return Err(ConfigurationError::InvalidMaxExecutions(max));
        }
    }
    if rule.enabled {
        validate_actions(&rule.actions)?;
    }
    Ok(())
}

/// Validate an action list that is about to become live.
pub fn validate_actions(actions: &[ActionConfig]) -> Result<(), ConfigurationError> {
    if actions.is_empty() {
        return Err(ConfigurationError::EmptyActions);
    }
    actions
        .iter()
        .enumerate()
        .try_for_each(|(index, action)| validate_action(index, action))
}

/// Every entry must parse as an IP address or CIDR block.
pub fn validate_allowed_ips(entries: &[String]) -> Result<(), ConfigurationError> {
    for entry in entries {
        let entry = entry.trim();
        if entry.parse::<IpAddr>().is_err() && entry.parse::<IpNetwork>().is_err() {
            return Err(ConfigurationError::InvalidAllowedIp(entry.to_owned()));
        }
    }
    Ok(())
}

fn validate_action(index: usize, action: &ActionConfig) -> Result<(), ConfigurationError> {
    let kind = action.kind();
    let missing = |field: &'static str| ConfigurationError::MissingField {
        index,
        action: kind,
        field,
    };
    let invalid = |field: &'static str, reason: String| ConfigurationError::InvalidField {
        index,
        action: kind,
        field,
        reason,
    };

    match action {
        ActionConfig::MoveCard { target_list_id } => {
            require(target_list_id).ok_or_else(|| missing("targetListId"))?;
        }
        ActionConfig::AssignMember {
            user_id,
            assign_creator,
            assign_random,
        } => {
            if !(present(user_id) || *assign_creator || *assign_random) {
                return Err(missing("userId"));
            }
        }
        ActionConfig::AddLabel {
            label_id, label_name, ..
        }
        | ActionConfig::RemoveLabel { label_id, label_name } => {
            if !(present(label_id) || present(label_name)) {
                return Err(missing("labelId"));
            }
        }
        ActionConfig::AddComment { content } => {
            require(content).ok_or_else(|| missing("content"))?;
        }
        ActionConfig::SendNotification { message, .. } => {
            require(message).ok_or_else(|| missing("message"))?;
        }
        ActionConfig::SendWebhook { webhook_url, .. } => {
            let url = require(webhook_url).ok_or_else(|| missing("webhookUrl"))?;
            let parsed =
                reqwest::Url::parse(url).map_err(|e| invalid("webhookUrl", e.to_string()))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(invalid(
                    "webhookUrl",
                    format!("unsupported scheme '{}'", parsed.scheme()),
                ));
            }
        }
        ActionConfig::SetDueDate { due_date_hour, .. } => {
            if let Some(hour) = due_date_hour {
                if *hour > 23 {
                    return Err(invalid("dueDateHour", format!("{hour} is not an hour of the day")));
                }
            }
        }
        ActionConfig::CopyCard { target_list_id, .. } => {
            if matches!(target_list_id, Some(id) if id.trim().is_empty()) {
                return Err(missing("targetListId"));
            }
        }
        ActionConfig::CreateChecklist { checklist_name, .. } => {
            require(checklist_name).ok_or_else(|| missing("checklistName"))?;
        }
        ActionConfig::UnassignMember { .. }
        | ActionConfig::ArchiveCard {}
        | ActionConfig::MarkChecklistComplete { .. } => {}
    }
    Ok(())
}

fn require(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().and_then(require).is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
