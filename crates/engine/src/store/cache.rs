//! Per-board cache of enabled rules in front of a [`RuleStore`].
//!
//! Only [`RuleStore::enabled_rules_for_board`] is served from the cache.
//! Every write through this wrapper drops the affected board's entry, and
//! claiming an execution of a capped rule does too so the cap is seen by
//! the next event.
//!
//! Each board carries a generation bumped by every invalidation.  A miss
//! only fills the cache if the generation is unchanged after the inner
//! read, so a write that lands during the read is never masked.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use super::RuleStore;
use crate::error::EngineError;
use crate::models::AutomationRule;

pub struct CachedRuleStore {
    inner: Arc<dyn RuleStore>,
    boards: DashMap<String, Arc<Vec<AutomationRule>>>,
    generations: DashMap<String, u64>,
}

impl CachedRuleStore {
    pub fn new(inner: Arc<dyn RuleStore>) -> Self {
        Self {
            inner,
            boards: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    pub fn invalidate(&self, board_id: &str) {
        let mut generation = self.generations.entry(board_id.to_owned()).or_insert(0);
        *generation += 1;
        if self.boards.remove(board_id).is_some() {
            debug!(board_id, generation = *generation, "rule cache invalidated");
        }
    }

    fn generation(&self, board_id: &str) -> u64 {
        self.generations.get(board_id).map_or(0, |g| *g)
    }

    /// Board whose cached entry holds `rule_id`, if any.
    fn cached_board_of(&self, rule_id: Uuid) -> Option<(String, bool)> {
        self.boards.iter().find_map(|entry| {
            entry
                .value()
                .iter()
                .find(|r| r.id == rule_id)
                .map(|r| (entry.key().clone(), r.max_executions.is_some()))
        })
    }
}

#[async_trait]
impl RuleStore for CachedRuleStore {
    async fn enabled_rules_for_board(
        &self,
        board_id: &str,
    ) -> Result<Vec<AutomationRule>, EngineError> {
        if let Some(hit) = self.boards.get(board_id) {
            return Ok(hit.value().as_ref().clone());
        }
        let seen = self.generation(board_id);
        let rules = self.inner.enabled_rules_for_board(board_id).await?;

        // Held across the insert so an invalidation cannot slip in between.
        let current = self.generations.entry(board_id.to_owned()).or_insert(0);
        if *current == seen {
            self.boards
                .insert(board_id.to_owned(), Arc::new(rules.clone()));
        } else {
            debug!(board_id, "rules changed during lookup; not cached");
        }
        Ok(rules)
    }

    async fn rules_for_board(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError> {
        self.inner.rules_for_board(board_id).await
    }

    async fn get_rule(&self, id: Uuid) -> Result<Option<AutomationRule>, EngineError> {
        self.inner.get_rule(id).await
    }

    async fn insert_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        self.inner.insert_rule(rule).await?;
        self.invalidate(&rule.board_id);
        Ok(())
    }

    async fn update_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
        self.inner.update_rule(rule).await?;
        self.invalidate(&rule.board_id);
        Ok(())
    }

    async fn delete_rule(&self, id: Uuid) -> Result<bool, EngineError> {
        let board = self.inner.get_rule(id).await?.map(|r| r.board_id);
        let deleted = self.inner.delete_rule(id).await?;
        if let Some(board) = board {
            self.invalidate(&board);
        }
        Ok(deleted)
    }

    async fn claim_execution(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<i64>, EngineError> {
        let claimed = self.inner.claim_execution(id, at).await?;
        if let Some((board, true)) = self.cached_board_of(id) {
            self.invalidate(&board);
        }
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::sync::Notify;

    use crate::models::{ActionConfig, TriggerType};
    use crate::store::MemoryStore;

    /// Inner store whose enabled-rule read can be held open after it has
    /// read, so a concurrent write lands before the cache is filled.
    struct PausedReads {
        inner: MemoryStore,
        pause: AtomicBool,
        read: Notify,
        resume: Notify,
    }

    #[async_trait]
    impl RuleStore for PausedReads {
        async fn enabled_rules_for_board(
            &self,
            board_id: &str,
        ) -> Result<Vec<AutomationRule>, EngineError> {
            let rules = self.inner.enabled_rules_for_board(board_id).await?;
            if self.pause.swap(false, Ordering::SeqCst) {
                self.read.notify_one();
                self.resume.notified().await;
            }
            Ok(rules)
        }

        async fn rules_for_board(&self, board_id: &str) -> Result<Vec<AutomationRule>, EngineError> {
            self.inner.rules_for_board(board_id).await
        }

        async fn get_rule(&self, id: Uuid) -> Result<Option<AutomationRule>, EngineError> {
            self.inner.get_rule(id).await
        }

        async fn insert_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
            self.inner.insert_rule(rule).await
        }

        async fn update_rule(&self, rule: &AutomationRule) -> Result<(), EngineError> {
            self.inner.update_rule(rule).await
        }

        async fn delete_rule(&self, id: Uuid) -> Result<bool, EngineError> {
            self.inner.delete_rule(id).await
        }

        async fn claim_execution(
            &self,
            id: Uuid,
            at: DateTime<Utc>,
        ) -> Result<Option<i64>, EngineError> {
            self.inner.claim_execution(id, at).await
        }
    }

    fn rule() -> AutomationRule {
        AutomationRule::new("b1", "r", TriggerType::CardCreated, "u1")
            .with_action(ActionConfig::ArchiveCard {})
    }

    #[tokio::test]
    async fn writes_through_the_cache_are_visible_immediately() {
        let cache = CachedRuleStore::new(Arc::new(MemoryStore::new()));
        assert!(cache.enabled_rules_for_board("b1").await.unwrap().is_empty());

        let r = rule();
        cache.insert_rule(&r).await.unwrap();
        assert_eq!(cache.enabled_rules_for_board("b1").await.unwrap().len(), 1);

        let mut disabled = r.clone();
        disabled.enabled = false;
        cache.update_rule(&disabled).await.unwrap();
        assert!(cache.enabled_rules_for_board("b1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_behind_the_cache_are_not_seen_until_invalidated() {
        let inner = Arc::new(MemoryStore::new());
        let cache = CachedRuleStore::new(inner.clone());
        cache.enabled_rules_for_board("b1").await.unwrap();

        inner.insert_rule(&rule()).await.unwrap();
        assert!(cache.enabled_rules_for_board("b1").await.unwrap().is_empty());

        cache.invalidate("b1");
        assert_eq!(cache.enabled_rules_for_board("b1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn claiming_a_capped_rule_refreshes_its_count() {
        let cache = CachedRuleStore::new(Arc::new(MemoryStore::new()));
        let capped = rule().with_max_executions(1);
        cache.insert_rule(&capped).await.unwrap();
        cache.enabled_rules_for_board("b1").await.unwrap();

        cache.claim_execution(capped.id, Utc::now()).await.unwrap();

        let rules = cache.enabled_rules_for_board("b1").await.unwrap();
        assert_eq!(rules[0].execution_count, 1);
        assert!(!rules[0].has_capacity());
    }

    #[tokio::test]
    async fn delete_invalidates_the_owning_board() {
        let cache = CachedRuleStore::new(Arc::new(MemoryStore::new()));
        let r = rule();
        cache.insert_rule(&r).await.unwrap();
        assert_eq!(cache.enabled_rules_for_board("b1").await.unwrap().len(), 1);

        assert!(cache.delete_rule(r.id).await.unwrap());
        assert!(cache.enabled_rules_for_board("b1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn a_write_during_a_miss_is_not_masked_by_the_stale_read() {
        let inner = Arc::new(PausedReads {
            inner: MemoryStore::new(),
            pause: AtomicBool::new(false),
            read: Notify::new(),
            resume: Notify::new(),
        });
        let cache = Arc::new(CachedRuleStore::new(inner.clone()));
        let r = rule();
        cache.insert_rule(&r).await.unwrap();

        inner.pause.store(true, Ordering::SeqCst);
        let lookup = tokio::spawn({
            let cache = cache.clone();
            async move { cache.enabled_rules_for_board("b1").await.unwrap() }
        });
        inner.read.notified().await;

        let mut disabled = r.clone();
        disabled.enabled = false;
        cache.update_rule(&disabled).await.unwrap();
        inner.resume.notify_one();

        assert_eq!(lookup.await.unwrap().len(), 1);
        assert!(cache.enabled_rules_for_board("b1").await.unwrap().is_empty());
    }
}
