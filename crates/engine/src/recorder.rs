//! Execution log recorder: one log per rule firing or webhook call.
//!
//! ```text
//! pending ──► running ──► success | failed
//!    └──────► skipped
//! ```
//!
//! A log is written when it is opened and again on every transition.
//! Terminal logs are never written again; the stores refuse it too.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::error::EngineError;
use crate::models::{ActionOutcome, AutomationLog, EventContext, LogSource, LogStatus};
use crate::store::LogStore;

pub struct LogRecorder {
    logs: Arc<dyn LogStore>,
}

impl LogRecorder {
    pub fn new(logs: Arc<dyn LogStore>) -> Self {
        Self { logs }
    }

    /// Create and persist a `pending` log with a snapshot of the context.
    pub async fn open(
        &self,
        source: LogSource,
        trigger_event: &str,
        context: &EventContext,
    ) -> Result<AutomationLog, EngineError> {
        let snapshot = serde_json::to_value(context)?;
        let log = AutomationLog::pending(source, trigger_event, snapshot);
        self.logs.insert_log(&log).await?;
        debug!(log_id = %log.id, "log opened");
        Ok(log)
    }

    /// `pending → running`.  Duration is measured from here.
    pub async fn start(&self, log: &mut AutomationLog) -> Result<(), EngineError> {
        log.transition(LogStatus::Running)?;
        log.started_at = Utc::now();
        self.logs.update_log(log).await
    }

    /// `running → success | failed` from the action outcomes.
    pub async fn finish(
        &self,
        log: &mut AutomationLog,
        outcomes: Vec<ActionOutcome>,
    ) -> Result<LogStatus, EngineError> {
        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        let status = if failed == 0 {
            LogStatus::Success
        } else {
            log.error = Some(format!("{failed} of {} actions failed", outcomes.len()));
            LogStatus::Failed
        };
        log.actions_executed = outcomes;
        log.transition(status)?;
        self.logs.update_log(log).await?;
        Ok(status)
    }

    /// `running → failed` when the firing could not run its actions at all.
    pub async fn abort(&self, log: &mut AutomationLog, error: String) -> Result<(), EngineError> {
        log.error = Some(error);
        log.transition(LogStatus::Failed)?;
        self.logs.update_log(log).await
    }

    /// `pending → skipped`.
    pub async fn skip(&self, log: &mut AutomationLog, reason: &str) -> Result<(), EngineError> {
        log.error = Some(reason.to_owned());
        log.transition(LogStatus::Skipped)?;
        self.logs.update_log(log).await
    }
}
