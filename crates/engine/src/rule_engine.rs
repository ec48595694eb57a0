//! The rule engine.  Drives one event through
//! matcher → evaluator → executor → recorder.
//!
//! Rules for one event run sequentially in priority order and share one
//! mutable context, so a later rule sees what an earlier rule changed.
//! Each rule is isolated: store errors or action failures while firing one
//! rule are logged and the next rule still runs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use queue::JobHandler;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::EngineError;
use crate::evaluator::evaluate;
use crate::executor::ActionExecutor;
use crate::matcher::TriggerMatcher;
use crate::models::{AutomationRule, EventContext, LogSource, LogStatus, TriggerEvent};
use crate::recorder::LogRecorder;
use crate::store::RuleStore;

const CONDITIONS_NOT_MET: &str = "conditions not met";
const EXECUTION_LIMIT_REACHED: &str = "execution limit reached";

/// What happened to one candidate rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleFiring {
    pub rule_id: Uuid,
    pub log_id: Uuid,
    /// `skipped`, `success` or `failed`.
    pub status: LogStatus,
}

/// Summary of one processed event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventReport {
    pub candidates: usize,
    pub firings: Vec<RuleFiring>,
    /// Rules whose firing was cut short by a store error.
    pub errors: usize,
}

impl EventReport {
    pub fn status_of(&self, rule_id: Uuid) -> Option<LogStatus> {
        self.firings
            .iter()
            .find(|f| f.rule_id == rule_id)
            .map(|f| f.status)
    }
}

pub struct RuleEngine {
    matcher: TriggerMatcher,
    rules: Arc<dyn RuleStore>,
    executor: Arc<ActionExecutor>,
    recorder: Arc<LogRecorder>,
}

impl RuleEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        executor: Arc<ActionExecutor>,
        recorder: Arc<LogRecorder>,
    ) -> Self {
        Self {
            matcher: TriggerMatcher::new(rules.clone()),
            rules,
            executor,
            recorder,
        }
    }

    /// Process one event to completion.  Never fails: problems are logged
    /// and reflected in the report.
    #[instrument(skip(self, event), fields(board_id = %event.board_id, event = %event.event_type))]
    pub async fn process(&self, event: TriggerEvent) -> EventReport {
        let mut report = EventReport::default();

        let candidates = match self.matcher.candidates(&event).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(error = %e, "could not load rules for event");
                report.errors += 1;
                return report;
            }
        };
        report.candidates = candidates.len();

        let mut context = event.context.clone();
        for rule in &candidates {
            match self.fire(rule, &event, &mut context).await {
                Ok(firing) => report.firings.push(firing),
                Err(e) => {
                    error!(rule_id = %rule.id, error = %e, "rule firing aborted");
                    report.errors += 1;
                }
            }
        }

        info!(
            candidates = report.candidates,
            fired = report.firings.iter().filter(|f| f.status != LogStatus::Skipped).count(),
            errors = report.errors,
            "event processed"
        );
        report
    }

    async fn fire(
        &self,
        rule: &AutomationRule,
        event: &TriggerEvent,
        context: &mut EventContext,
    ) -> Result<RuleFiring, EngineError> {
        let mut log = self
            .recorder
            .open(LogSource::Rule(rule.id), event.event_type.as_str(), context)
            .await?;
        let (rule_id, log_id) = (rule.id, log.id);
        let firing = move |status| RuleFiring {
            rule_id,
            log_id,
            status,
        };

        if !evaluate(&rule.conditions, context) {
            debug!(rule_id = %rule.id, "conditions rejected event");
            self.recorder.skip(&mut log, CONDITIONS_NOT_MET).await?;
            return Ok(firing(LogStatus::Skipped));
        }

        match self.rules.claim_execution(rule.id, Utc::now()).await {
            Ok(Some(count)) => debug!(rule_id = %rule.id, count, "execution claimed"),
            Ok(None) => {
                debug!(rule_id = %rule.id, "execution cap reached concurrently");
                self.recorder.skip(&mut log, EXECUTION_LIMIT_REACHED).await?;
                return Ok(firing(LogStatus::Skipped));
            }
            Err(e) => {
                self.recorder.start(&mut log).await?;
                self.recorder.abort(&mut log, e.to_string()).await?;
                return Err(e);
            }
        }

        self.recorder.start(&mut log).await?;
        let outcomes = self
            .executor
            .execute_all(&event.board_id, &rule.actions, context)
            .await;
        let status = self.recorder.finish(&mut log, outcomes).await?;
        debug!(rule_id = %rule.id, %status, "rule fired");
        Ok(firing(status))
    }
}

#[async_trait]
impl JobHandler<TriggerEvent> for RuleEngine {
    async fn handle(&self, event: TriggerEvent) {
        self.process(event).await;
    }
}
