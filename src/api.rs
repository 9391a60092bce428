//! HTTP API for the AgriAssist client

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::actions::{ActionContext, ActionRegistry, Navigator};
use crate::advisor::Advisor;
use crate::db::Database;
use crate::history::ConversationHistory;
use crate::language::LanguageSelection;
use crate::llm::LlmService;
use crate::market::Marketplace;
use crate::runtime::{spawn_assistant, AssistantHandle, LlmClient, RegistryExecutor, ServiceLlmClient};
use crate::speech::{ClientSynthesizer, SpeechController, Utterance};
use crate::store::DatabaseStorage;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub assistant: AssistantHandle,
    pub storage: Arc<DatabaseStorage>,
    pub marketplace: Arc<Marketplace>,
    pub navigator: Navigator,
    pub speech: Arc<SpeechController>,
    pub utterances: broadcast::Sender<Utterance>,
    pub advisor: Arc<Advisor>,
}

impl AppState {
    /// Wire up storage, actions, speech and the assistant runtime.
    /// Must be called from within a tokio runtime.
    pub fn new(
        db: Database,
        service: Option<Arc<dyn LlmService>>,
        language: LanguageSelection,
    ) -> Self {
        Self::with_llm(db, Arc::new(ServiceLlmClient::new(service)), language)
    }

    pub fn with_llm(db: Database, llm: Arc<dyn LlmClient>, language: LanguageSelection) -> Self {
        let storage = Arc::new(DatabaseStorage::new(db));
        let marketplace = Arc::new(Marketplace::new(storage.clone()));
        let navigator = Navigator::default();
        let (utterances, _) = broadcast::channel(16);
        let speech = Arc::new(SpeechController::new(Arc::new(ClientSynthesizer::new(
            utterances.clone(),
        ))));

        let ctx = ActionContext {
            profiles: storage.clone(),
            marketplace: marketplace.clone(),
            navigator: navigator.clone(),
        };
        let assistant = spawn_assistant(
            llm.clone(),
            RegistryExecutor::new(ActionRegistry::standard(), ctx),
            ConversationHistory::default(),
            language,
            speech.clone(),
        );

        Self {
            assistant,
            storage,
            marketplace,
            navigator,
            speech,
            utterances,
            advisor: Arc::new(Advisor::new(llm)),
        }
    }
}
