//! Assistant runtime executor

use super::traits::{ActionExecutor, LlmClient};
use super::{AssistantEvent, Command};

use crate::actions::ActionRequest;
use crate::history::{ConversationHistory, Turn, GREETING};
use crate::language::LanguageSelection;
use crate::llm::{LlmRequest, SystemContent};
use crate::speech::SpeechController;
use crate::state_machine::{transition, ConvState, Effect, Event, Phase, TransitionError};
use crate::system_prompt::build_system_prompt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Drives user turns through the state machine
pub struct AssistantRuntime<L, E>
where
    L: LlmClient + 'static,
    E: ActionExecutor + 'static,
{
    state: ConvState,
    llm_client: Arc<L>,
    action_executor: Arc<E>,
    history: ConversationHistory,
    language: LanguageSelection,
    speech: Arc<SpeechController>,
    command_rx: mpsc::Receiver<Command>,
    /// Weak so the loop ends once every handle is dropped and no task is in flight
    command_tx: mpsc::WeakSender<Command>,
    broadcast_tx: broadcast::Sender<AssistantEvent>,
    phase_tx: watch::Sender<Phase>,
}

impl<L, E> AssistantRuntime<L, E>
where
    L: LlmClient + 'static,
    E: ActionExecutor + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        llm_client: L,
        action_executor: E,
        history: ConversationHistory,
        language: LanguageSelection,
        speech: Arc<SpeechController>,
        command_rx: mpsc::Receiver<Command>,
        command_tx: mpsc::WeakSender<Command>,
        broadcast_tx: broadcast::Sender<AssistantEvent>,
        phase_tx: watch::Sender<Phase>,
    ) -> Self {
        Self {
            state: ConvState::Idle,
            llm_client: Arc::new(llm_client),
            action_executor: Arc::new(action_executor),
            history,
            language,
            speech,
            command_rx,
            command_tx,
            broadcast_tx,
            phase_tx,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(model = %self.llm_client.model_id(), "Starting assistant runtime");

        while let Some(Command { event, reply }) = self.command_rx.recv().await {
            let result = self.process_event(event);
            match reply {
                Some(reply) => {
                    let _ = reply.send(result);
                }
                None => {
                    if let Err(e) = result {
                        // Internal events that do not fit the current state are dropped
                        tracing::warn!(error = %e, "Dropped runtime event");
                    }
                }
            }
        }

        tracing::info!("Assistant runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        if let (ConvState::AwaitingFollowUp { .. }, Event::ModelResponse { action_requests, .. }) =
            (&self.state, &event)
        {
            if !action_requests.is_empty() {
                tracing::warn!(
                    count = action_requests.len(),
                    "Ignoring action requests in follow-up reply"
                );
            }
        }

        let event_name = event.name();
        let result = transition(&self.state, event)?;
        tracing::debug!(
            event = event_name,
            from = self.state.name(),
            to = result.new_state.name(),
            "State transition"
        );
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&self, effect: Effect) {
        match effect {
            Effect::RequestModel { staged } => self.request_model(&staged),

            Effect::ExecuteAction { request } => self.execute_action(request),

            Effect::CommitTurns { turns } => {
                tracing::debug!(turns = turns.len(), "Committing round trip");
                self.history.append_all(turns);
            }

            Effect::Display { message } => {
                let _ = self.broadcast_tx.send(AssistantEvent::Message { message });
            }

            Effect::Speak { text } => {
                // Playback runs on its own; a newer reply cancels it
                drop(self.speech.speak(&text, self.language.current().code));
            }

            Effect::NotifyState { phase } => {
                self.phase_tx.send_replace(phase);
                let _ = self.broadcast_tx.send(AssistantEvent::StateChange { phase });
            }

            Effect::NotifyError { message } => {
                tracing::error!(error = %message, "Model request failed");
                let _ = self.broadcast_tx.send(AssistantEvent::Error { message });
            }

            Effect::TurnComplete => {
                let _ = self.broadcast_tx.send(AssistantEvent::TurnComplete);
            }

            Effect::ResetHistory => {
                self.speech.cancel();
                self.history.reset(GREETING);
                tracing::info!("Conversation reset");
                let _ = self.broadcast_tx.send(AssistantEvent::Reset);
            }
        }
    }

    /// Spawn the model request; the answer comes back as an event
    fn request_model(&self, staged: &[Turn]) {
        let Some(event_tx) = self.command_tx.upgrade() else {
            return;
        };

        let language = self.language.current();
        let messages = self
            .history
            .snapshot()
            .iter()
            .chain(staged)
            .map(Turn::to_llm_message)
            .collect();
        let request = LlmRequest {
            system: vec![SystemContent::new(build_system_prompt(language.label))],
            messages,
            tools: self.action_executor.definitions(),
            response_schema: None,
        };
        let llm_client = self.llm_client.clone();

        tokio::spawn(async move {
            tracing::debug!(
                language = language.code,
                messages = request.messages.len(),
                "Making LLM request (background)"
            );

            let event = match llm_client.complete(&request).await {
                Ok(response) => Event::ModelResponse {
                    text: response.text_opt(),
                    action_requests: response
                        .tool_uses()
                        .into_iter()
                        .map(|(name, input)| ActionRequest::from_tool_use(name, input))
                        .collect(),
                },
                Err(e) => Event::ModelError { message: e.message },
            };
            let _ = event_tx.send(Command { event, reply: None }).await;
        });
    }

    /// Spawn one action; its result comes back as an event
    fn execute_action(&self, request: ActionRequest) {
        let Some(event_tx) = self.command_tx.upgrade() else {
            return;
        };
        let action_executor = self.action_executor.clone();

        tokio::spawn(async move {
            tracing::info!(action = %request.name, "Executing action (background)");
            let result = action_executor.execute(&request).await;
            let _ = event_tx
                .send(Command {
                    event: Event::ActionComplete { result },
                    reply: None,
                })
                .await;
        });
    }
}
