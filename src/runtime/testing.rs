//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{spawn_assistant, AssistantEvent, AssistantHandle};
use crate::actions::{ActionContext, ActionRegistry, Navigator};
use crate::db::{Database, Listing};
use crate::history::ConversationHistory;
use crate::language::LanguageSelection;
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, Usage};
use crate::market::Marketplace;
use crate::speech::{SpeechController, SpeechError, SpeechSynthesizer, Utterance};
use crate::store::{DatabaseStorage, ListingStore, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;

// ============================================================================
// Response builders
// ============================================================================

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        usage: Usage::default(),
    }
}

/// A response that requests the given actions, in order
pub fn action_response(calls: &[(&str, Value)]) -> LlmResponse {
    LlmResponse {
        content: calls
            .iter()
            .map(|(name, input)| ContentBlock::tool_use(*name, input.clone()))
            .collect(),
        usage: Usage::default(),
    }
}

pub fn empty_response() -> LlmResponse {
    LlmResponse {
        content: vec![],
        usage: Usage::default(),
    }
}

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Delayed Mock LLM Client (for single-flight testing)
// ============================================================================

/// Mock LLM client with configurable delay
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
    /// Notified when request starts (for test synchronization)
    pub request_started: Arc<Notify>,
}

impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
            request_started: Arc::new(Notify::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.inner.queue_response(response);
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.request_started.notify_waiters();
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Failing Listing Store
// ============================================================================

/// Listing store whose every operation fails
#[derive(Default)]
pub struct FailingListingStore;

#[async_trait]
impl ListingStore for FailingListingStore {
    async fn farmer_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn add_listing(&self, _listing: Listing) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn delete_listing(&self, _id: i64) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn trader_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }
}

// ============================================================================
// Recording Synthesizer
// ============================================================================

/// Records every utterance instead of playing it
#[derive(Default)]
pub struct RecordingSynthesizer {
    pub spoken: Mutex<Vec<Utterance>>,
}

impl RecordingSynthesizer {
    pub fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.text.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(
        &self,
        utterance: Utterance,
        _cancel: CancellationToken,
    ) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(utterance);
        Ok(())
    }
}

// ============================================================================
// Action contexts
// ============================================================================

/// Action context over a fresh in-memory database
pub fn action_context() -> ActionContext {
    let storage = Arc::new(DatabaseStorage::new(Database::open_in_memory().unwrap()));
    ActionContext {
        profiles: storage.clone(),
        marketplace: Arc::new(Marketplace::new(storage)),
        navigator: Navigator::default(),
    }
}

/// Action context with a custom listing store
pub fn action_context_with(listings: Arc<dyn ListingStore>) -> ActionContext {
    let storage = Arc::new(DatabaseStorage::new(Database::open_in_memory().unwrap()));
    ActionContext {
        profiles: storage,
        marketplace: Arc::new(Marketplace::new(listings)),
        navigator: Navigator::default(),
    }
}

// ============================================================================
// Test Runtime
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime<L: LlmClient + 'static> {
    pub handle: AssistantHandle,
    pub events: broadcast::Receiver<AssistantEvent>,
    pub llm: Arc<L>,
    pub ctx: ActionContext,
    pub speech: Arc<RecordingSynthesizer>,
}

impl TestRuntime<MockLlmClient> {
    /// Create a simple test runtime with instant mocks
    pub fn builder() -> TestRuntimeBuilder<MockLlmClient> {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder<L> {
    llm: Option<L>,
    ctx: Option<ActionContext>,
    language: LanguageSelection,
}

impl<L: LlmClient + 'static> TestRuntimeBuilder<L> {
    pub fn new() -> Self {
        Self {
            llm: None,
            ctx: None,
            language: LanguageSelection::default(),
        }
    }

    pub fn llm(mut self, llm: L) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn ctx(mut self, ctx: ActionContext) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn language(mut self, code: &str) -> Self {
        self.language = LanguageSelection::new(code).unwrap();
        self
    }

    pub fn build(self) -> TestRuntime<L>
    where
        L: Default,
    {
        let mut builder = self;
        let llm = builder.llm.take().unwrap_or_default();
        builder.build_with(llm)
    }

    pub fn build_with(self, llm: L) -> TestRuntime<L> {
        let llm = Arc::new(llm);
        let ctx = self.ctx.unwrap_or_else(action_context);
        let speech = Arc::new(RecordingSynthesizer::default());
        let executor = RegistryExecutor::new(ActionRegistry::standard(), ctx.clone());

        let handle = spawn_assistant(
            llm.clone(),
            executor,
            ConversationHistory::default(),
            self.language,
            Arc::new(SpeechController::new(speech.clone())),
        );
        let events = handle.subscribe();

        TestRuntime {
            handle,
            events,
            llm,
            ctx,
            speech,
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new("test-model")
    }
}

impl<L: LlmClient + 'static> TestRuntime<L> {
    /// Wait for the end of the current user turn
    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if let Ok(Ok(AssistantEvent::TurnComplete)) =
                tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await
            {
                return true;
            }
        }
        false
    }

    /// Send a message and wait for the turn to finish
    pub async fn round_trip(&mut self, text: &str) {
        self.handle.send_message(text).await.unwrap();
        assert!(
            self.wait_for_done(Duration::from_secs(5)).await,
            "turn did not complete"
        );
        // Let detached speech tasks run
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionResult, Screen};
    use crate::history::{DisplayMessage, Turn, ERROR_REPLY, GREETING};
    use crate::llm::MessageRole;
    use crate::market::ListingChange;
    use crate::runtime::SubmitError;
    use crate::state_machine::Phase;
    use serde_json::json;
    use tokio::sync::broadcast::error::TryRecvError;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn navigate(screen: &str) -> (&'static str, Value) {
        ("navigate_to_screen", json!({ "screen": screen }))
    }

    #[tokio::test]
    async fn test_mock_llm_client() {
        let mock = MockLlmClient::new("test-model");
        mock.queue_response(text_response("Hello"));

        let response = mock.complete(&LlmRequest::prompt("Hi")).await.unwrap();
        assert_eq!(response.text(), "Hello");
        assert_eq!(mock.recorded_requests().len(), 1);
        assert!(mock.complete(&LlmRequest::prompt("Again")).await.is_err());
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("Cotton needs well-drained soil."));
        let mut rt = TestRuntime::builder().llm(llm).build();

        rt.round_trip("How do I grow cotton?").await;

        assert_eq!(
            rt.handle.history().snapshot(),
            vec![
                Turn::assistant(GREETING),
                Turn::user("How do I grow cotton?"),
                Turn::assistant("Cotton needs well-drained soil."),
            ]
        );
        assert_eq!(rt.speech.texts(), vec!["Cotton needs well-drained soil."]);
        assert_eq!(rt.handle.phase(), Phase::Idle);

        let request = &rt.llm.recorded_requests()[0];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.tools.len(), 2);
        assert!(request.system[0].text.contains("Kannada (ಕನ್ನಡ)"));
    }

    #[tokio::test]
    async fn test_navigate_round_trip() {
        let llm = MockLlmClient::default();
        llm.queue_response(action_response(&[navigate("MARKETPLACE")]));
        llm.queue_response(text_response("Marukattege hogona."));
        let mut rt = TestRuntime::builder().llm(llm).build();
        let mut screens = rt.ctx.navigator.subscribe();

        rt.round_trip("Marukattege hogo").await;

        assert_eq!(screens.try_recv().unwrap(), Screen::Marketplace);
        let turns = rt.handle.history().snapshot();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[1], Turn::user("Marukattege hogo"));
        assert!(matches!(
            &turns[3].content,
            crate::history::TurnContent::ActionResults(results) if results[0].succeeded
        ));
        assert_eq!(turns[4], Turn::assistant("Marukattege hogona."));

        // The follow-up request ends with the action result
        let requests = rt.llm.recorded_requests();
        assert_eq!(requests.len(), 2);
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert!(matches!(
            &last.content[0],
            ContentBlock::ToolResult { name, content, .. }
                if name == "navigate_to_screen" && content.contains("MARKETPLACE")
        ));
    }

    #[tokio::test]
    async fn test_batch_runs_in_order_and_keeps_history_order() {
        let llm = MockLlmClient::default();
        llm.queue_response(action_response(&[
            ("add_market_listing", json!({"crop": "Bajra", "price": 1800})),
            navigate("MARKETPLACE"),
        ]));
        llm.queue_response(text_response("Bajra listed."));
        llm.queue_response(text_response("Opening the market."));
        let mut rt = TestRuntime::builder().llm(llm).build();
        let mut changes = rt.ctx.marketplace.subscribe();

        rt.round_trip("Mujhe bajara bechna hai").await;

        let turns = rt.handle.history().snapshot();
        let kinds: Vec<_> = turns.iter().map(|t| t.speaker).collect();
        use crate::history::Speaker::{ActionResult as R, Assistant as A, User as U};
        assert_eq!(kinds, vec![A, U, A, R, A, R, A]);
        assert_eq!(turns[4], Turn::assistant("Bajra listed."));
        assert_eq!(turns[6], Turn::assistant("Opening the market."));

        assert!(matches!(changes.try_recv(), Ok(ListingChange::Added { .. })));
        assert!(matches!(changes.try_recv(), Err(TryRecvError::Empty)));
        let listings = rt.ctx.marketplace.listings().await.unwrap();
        assert_eq!(listings[0].crop, "Bajra");
        assert_eq!(listings[0].price, "₹1800/q");

        assert_eq!(
            rt.handle.transcript(),
            vec![
                DisplayMessage::assistant(GREETING),
                DisplayMessage::user("Mujhe bajara bechna hai"),
                DisplayMessage::assistant("Bajra listed."),
                DisplayMessage::assistant("Opening the market."),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_action_reported_to_model() {
        let llm = MockLlmClient::default();
        llm.queue_response(action_response(&[("sell_everything", json!({}))]));
        llm.queue_response(text_response("I cannot do that."));
        let mut rt = TestRuntime::builder().llm(llm).build();
        let before = rt.ctx.marketplace.listings().await.unwrap();

        rt.round_trip("sell it all").await;

        let turns = rt.handle.history().snapshot();
        assert_eq!(
            turns[3],
            Turn::action_result(ActionResult::failure(
                "sell_everything",
                "Unknown action 'sell_everything'. Available actions: navigate_to_screen, add_market_listing."
            ))
        );
        assert_eq!(rt.ctx.marketplace.listings().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_store_failure_does_not_abort_batch() {
        let llm = MockLlmClient::default();
        llm.queue_response(action_response(&[
            ("add_market_listing", json!({"crop": "Bajra", "price": 1800})),
            navigate("HOME"),
        ]));
        llm.queue_response(text_response("Listing failed."));
        llm.queue_response(text_response("Going home."));
        let mut rt = TestRuntime::builder()
            .llm(llm)
            .ctx(action_context_with(Arc::new(FailingListingStore)))
            .build();
        let mut screens = rt.ctx.navigator.subscribe();

        rt.round_trip("sell bajra and go home").await;

        assert_eq!(screens.try_recv().unwrap(), Screen::Home);
        let turns = rt.handle.history().snapshot();
        assert_eq!(turns.len(), 7);
        assert!(matches!(
            &turns[3].content,
            crate::history::TurnContent::ActionResults(results) if !results[0].succeeded
        ));
        assert_eq!(turns[6], Turn::assistant("Going home."));
    }

    #[tokio::test]
    async fn test_model_error_gives_fixed_reply() {
        let llm = MockLlmClient::default();
        llm.queue_error(LlmError::network("connection refused"));
        let mut rt = TestRuntime::builder().llm(llm).build();

        rt.round_trip("Hello").await;

        assert_eq!(
            rt.handle.history().snapshot(),
            vec![
                Turn::assistant(GREETING),
                Turn::user("Hello"),
                Turn::assistant(ERROR_REPLY),
            ]
        );
        assert_eq!(rt.speech.texts(), vec![ERROR_REPLY]);
    }

    #[tokio::test]
    async fn test_follow_up_error_discards_partial_batch() {
        let llm = MockLlmClient::default();
        llm.queue_response(action_response(&[navigate("ALERTS"), navigate("PROFILE")]));
        llm.queue_error(LlmError::network("reset by peer"));
        let mut rt = TestRuntime::builder().llm(llm).build();
        let mut screens = rt.ctx.navigator.subscribe();

        rt.round_trip("alerts then profile").await;

        assert_eq!(screens.try_recv().unwrap(), Screen::Alerts);
        assert!(matches!(screens.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(rt.handle.history().snapshot().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_reply_leaves_history_untouched() {
        let llm = MockLlmClient::default();
        llm.queue_response(empty_response());
        let mut rt = TestRuntime::builder().llm(llm).build();

        rt.round_trip("...").await;

        assert_eq!(rt.handle.history().snapshot(), vec![Turn::assistant(GREETING)]);
        assert!(rt.speech.texts().is_empty());
    }

    #[tokio::test]
    async fn test_second_message_rejected_while_busy() {
        let llm = DelayedMockLlmClient::new("slow", Duration::from_millis(200));
        llm.queue_response(text_response("Done"));
        let mut rt = TestRuntimeBuilder::new().build_with(llm);

        rt.handle.send_message("first").await.unwrap();
        assert_eq!(rt.handle.send_message("second").await, Err(SubmitError::Busy));
        assert_eq!(rt.handle.reset().await, Err(SubmitError::Busy));

        assert!(rt.wait_for_done(TIMEOUT).await);
        let turns = rt.handle.history().snapshot();
        assert_eq!(turns.len(), 3);
        assert!(turns.iter().all(|t| *t != Turn::user("second")));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let rt = TestRuntime::builder().build();
        assert_eq!(rt.handle.send_message("  ").await, Err(SubmitError::Empty));
        assert!(rt.llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_language_change_applies_to_next_request() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("one"));
        llm.queue_response(text_response("two"));
        let mut rt = TestRuntime::builder().llm(llm).language("en-IN").build();

        rt.round_trip("hi").await;
        rt.handle.language().set("mr-IN").unwrap();
        rt.round_trip("namaskar").await;

        let requests = rt.llm.recorded_requests();
        assert!(requests[0].system[0].text.contains("speaking English."));
        assert!(requests[1].system[0].text.contains("Marathi (मराठी)"));
        // Second request carries the first round trip
        assert_eq!(requests[1].messages.len(), 4);
    }

    #[tokio::test]
    async fn test_reset_restores_greeting() {
        let llm = MockLlmClient::default();
        llm.queue_response(text_response("Hi"));
        let mut rt = TestRuntime::builder().llm(llm).build();

        rt.round_trip("Hello").await;
        rt.handle.reset().await.unwrap();

        assert_eq!(rt.handle.history().snapshot(), vec![Turn::assistant(GREETING)]);
    }

    #[tokio::test]
    async fn test_without_llm_service_every_turn_errors() {
        let mut rt = TestRuntimeBuilder::new().build_with(ServiceLlmClient::new(None));

        rt.round_trip("Hello").await;

        let turns = rt.handle.history().snapshot();
        assert_eq!(turns.last(), Some(&Turn::assistant(ERROR_REPLY)));
    }
}
