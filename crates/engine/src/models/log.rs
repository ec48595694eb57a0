//! Execution logs: one per rule or webhook invocation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// LogStatus
// ---------------------------------------------------------------------------

/// Lifecycle: `pending → running → success | failed`, or `pending → skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

impl LogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Skipped)
    }

    pub fn can_transition_to(&self, next: LogStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Skipped)
                | (Self::Running, Self::Success)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown log status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-action outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    /// Position of the action within the rule.
    pub index: usize,
    /// Action type tag.
    pub action: String,
    pub status: ActionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Success
    }
}

// ---------------------------------------------------------------------------
// AutomationLog
// ---------------------------------------------------------------------------

/// Who produced a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Rule(Uuid),
    Webhook(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationLog {
    pub id: Uuid,
    #[serde(default)]
    pub rule_id: Option<Uuid>,
    #[serde(default)]
    pub webhook_id: Option<Uuid>,
    pub trigger_event: String,
    pub trigger_data: Value,
    pub status: LogStatus,
    #[serde(default)]
    pub actions_executed: Vec<ActionOutcome>,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Milliseconds from `started_at` to `completed_at`.
    #[serde(default, rename = "duration")]
    pub duration_ms: Option<i64>,
}

impl AutomationLog {
    /// A fresh `pending` entry.
    pub fn pending(source: LogSource, trigger_event: impl Into<String>, trigger_data: Value) -> Self {
        let (rule_id, webhook_id) = match source {
            LogSource::Rule(id) => (Some(id), None),
            LogSource::Webhook(id) => (None, Some(id)),
        };
        Self {
            id: Uuid::new_v4(),
            rule_id,
            webhook_id,
            trigger_event: trigger_event.into(),
            trigger_data,
            status: LogStatus::Pending,
            actions_executed: Vec::new(),
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
        }
    }

    /// Move to `next`, stamping completion fields when `next` is terminal.
    pub fn transition(&mut self, next: LogStatus) -> Result<(), EngineError> {
        if self.status.is_terminal() {
            return Err(EngineError::LogFinalized(self.id));
        }
        if !self.status.can_transition_to(next) {
            return Err(EngineError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            let now = Utc::now();
            self.completed_at = Some(now);
            self.duration_ms = Some(if next == LogStatus::Skipped {
                0
            } else {
                (now - self.started_at).num_milliseconds().max(0)
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            LogStatus::Pending,
            LogStatus::Running,
            LogStatus::Success,
            LogStatus::Failed,
            LogStatus::Skipped,
        ] {
            assert_eq!(s.as_str().parse::<LogStatus>().unwrap(), s);
        }
        assert!("done".parse::<LogStatus>().is_err());
    }

    #[test]
    fn happy_path_stamps_completion() {
        let mut log = AutomationLog::pending(LogSource::Rule(Uuid::new_v4()), "card_created", json!({}));
        log.transition(LogStatus::Running).unwrap();
        assert!(log.completed_at.is_none());

        log.transition(LogStatus::Success).unwrap();
        assert!(log.completed_at.unwrap() >= log.started_at);
        assert!(log.duration_ms.unwrap() >= 0);
    }

    #[test]
    fn skipped_has_zero_duration() {
        let mut log = AutomationLog::pending(LogSource::Rule(Uuid::new_v4()), "card_created", json!({}));
        log.transition(LogStatus::Skipped).unwrap();
        assert_eq!(log.duration_ms, Some(0));
        assert!(log.completed_at.is_some());
    }

    #[test]
    fn terminal_logs_refuse_further_transitions() {
        let mut log = AutomationLog::pending(LogSource::Webhook(Uuid::new_v4()), "webhook_received", json!({}));
        log.transition(LogStatus::Skipped).unwrap();

        let err = log.transition(LogStatus::Running).unwrap_err();
        assert!(matches!(err, EngineError::LogFinalized(id) if id == log.id));
    }

    #[test]
    fn illegal_jumps_are_rejected() {
        let mut log = AutomationLog::pending(LogSource::Rule(Uuid::new_v4()), "card_moved", json!({}));
        let err = log.transition(LogStatus::Success).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransition { from: LogStatus::Pending, to: LogStatus::Success }
        ));
    }

    #[test]
    fn webhook_logs_carry_no_rule_id() {
        let hook = Uuid::new_v4();
        let log = AutomationLog::pending(LogSource::Webhook(hook), "webhook_received", json!({}));
        assert_eq!(log.rule_id, None);
        assert_eq!(log.webhook_id, Some(hook));

        let wire = serde_json::to_value(&log).unwrap();
        assert!(wire.get("duration").is_some());
        assert_eq!(wire["status"], "pending");
    }
}
