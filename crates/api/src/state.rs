//! Shared application state and its wiring.

use std::sync::Arc;

use board::{BoardService, Notifier};
use db::{DbPool, SecretCipher};
use engine::store::{CachedRuleStore, LogStore, MemoryStore, PgStore, RuleStore, WebhookStore};
use engine::{
    ActionExecutor, EngineConfig, LogRecorder, RuleEngine, RuleService, TemplateLibrary,
    TriggerEvent, WebhookGateway, WebhookSender, WebhookService,
};
use queue::{EventQueue, QueueConfig, WorkerHandle};

/// The three persistence seams, backed by the same store.
#[derive(Clone)]
pub struct Stores {
    pub rules: Arc<dyn RuleStore>,
    pub logs: Arc<dyn LogStore>,
    pub webhooks: Arc<dyn WebhookStore>,
}

impl Stores {
    pub fn memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            rules: store.clone(),
            logs: store.clone(),
            webhooks: store,
        }
    }

    pub fn postgres(pool: DbPool, cipher: SecretCipher) -> Self {
        let store = Arc::new(PgStore::new(pool, cipher));
        Self {
            rules: store.clone(),
            logs: store.clone(),
            webhooks: store,
        }
    }
}

/// Everything the engine talks to outside its own stores.
pub struct Backends {
    pub board: Arc<dyn BoardService>,
    pub notifier: Arc<dyn Notifier>,
    pub sender: Arc<dyn WebhookSender>,
}

#[derive(Clone)]
pub struct AppState {
    pub rules: Arc<RuleService>,
    pub webhooks: Arc<WebhookService>,
    pub gateway: Arc<WebhookGateway>,
    pub events: EventQueue<TriggerEvent>,
    /// Take the caller IP from `X-Forwarded-For` when behind a proxy.
    pub trust_forwarded_for: bool,
}

impl AppState {
    /// Wire services, gateway and engine together and start the event
    /// worker.  Must be called inside a tokio runtime.
    ///
    /// The worker drains and stops once every clone of the state is dropped.
    pub fn build(
        stores: Stores,
        backends: Backends,
        config: EngineConfig,
        queue: QueueConfig,
        trust_forwarded_for: bool,
    ) -> (Self, WorkerHandle) {
        let rules: Arc<dyn RuleStore> = Arc::new(CachedRuleStore::new(stores.rules));
        let executor = Arc::new(ActionExecutor::new(
            backends.board,
            backends.notifier,
            backends.sender,
        ));
        let recorder = Arc::new(LogRecorder::new(stores.logs.clone()));

        let engine = Arc::new(RuleEngine::new(rules.clone(), executor.clone(), recorder.clone()));
        let (events, worker) = EventQueue::<TriggerEvent>::start(engine, queue);

        let state = Self {
            rules: Arc::new(RuleService::new(
                rules,
                stores.logs.clone(),
                Arc::new(TemplateLibrary::new()),
                &config,
            )),
            webhooks: Arc::new(WebhookService::new(stores.webhooks.clone(), stores.logs, config)),
            gateway: Arc::new(WebhookGateway::new(stores.webhooks, executor, recorder)),
            events,
            trust_forwarded_for,
        };
        (state, worker)
    }
}
