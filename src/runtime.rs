//! Runtime for the assistant conversation
//!
//! A single background task owns the state machine and is the only writer
//! of the conversation history. Model calls and actions run as spawned tasks
//! that report back through the event channel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::AssistantRuntime;
pub use traits::*;

use crate::history::{display_messages, ConversationHistory, DisplayMessage};
use crate::language::LanguageSelection;
use crate::speech::SpeechController;
use crate::state_machine::{Event, Phase, TransitionError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Events sent to SSE clients
#[derive(Debug, Clone, PartialEq)]
pub enum AssistantEvent {
    Message { message: DisplayMessage },
    StateChange { phase: Phase },
    TurnComplete,
    Reset,
    Error { message: String },
}

/// An event for the runtime, with an optional channel for the transition outcome
#[derive(Debug)]
pub struct Command {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("Assistant is busy with the previous message")]
    Busy,
    #[error("Message is empty")]
    Empty,
    #[error("Assistant is not running")]
    Stopped,
    #[error("{0}")]
    Rejected(String),
}

impl From<TransitionError> for SubmitError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AssistantBusy => SubmitError::Busy,
            TransitionError::EmptyMessage => SubmitError::Empty,
            TransitionError::InvalidTransition(msg) => SubmitError::Rejected(msg),
        }
    }
}

/// Handle to interact with the running assistant
#[derive(Clone)]
pub struct AssistantHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<AssistantEvent>,
    phase_rx: watch::Receiver<Phase>,
    history: ConversationHistory,
    language: LanguageSelection,
}

impl AssistantHandle {
    /// Submit an utterance. Rejected unless the assistant is idle.
    pub async fn send_message(&self, text: &str) -> Result<(), SubmitError> {
        self.submit(Event::UserMessage {
            text: text.to_string(),
        })
        .await
    }

    /// Start a fresh conversation with the greeting
    pub async fn reset(&self) -> Result<(), SubmitError> {
        self.submit(Event::Reset).await
    }

    async fn submit(&self, event: Event) -> Result<(), SubmitError> {
        let (reply, outcome) = oneshot::channel();
        self.command_tx
            .send(Command {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| SubmitError::Stopped)?;
        outcome.await.map_err(|_| SubmitError::Stopped)??;
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssistantEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn phase(&self) -> Phase {
        *self.phase_rx.borrow()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// The renderable part of the committed history
    pub fn transcript(&self) -> Vec<DisplayMessage> {
        display_messages(&self.history.snapshot())
    }

    pub fn language(&self) -> &LanguageSelection {
        &self.language
    }
}

/// Start the assistant runtime on the current tokio runtime
pub fn spawn_assistant<L, E>(
    llm: L,
    executor: E,
    history: ConversationHistory,
    language: LanguageSelection,
    speech: Arc<SpeechController>,
) -> AssistantHandle
where
    L: LlmClient + 'static,
    E: ActionExecutor + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (phase_tx, phase_rx) = watch::channel(Phase::Idle);

    let runtime = AssistantRuntime::new(
        llm,
        executor,
        history.clone(),
        language.clone(),
        speech,
        command_rx,
        command_tx.downgrade(),
        broadcast_tx.clone(),
        phase_tx,
    );
    tokio::spawn(runtime.run());

    AssistantHandle {
        command_tx,
        broadcast_tx,
        phase_rx,
        history,
        language,
    }
}
