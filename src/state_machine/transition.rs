//! Pure state transition function

use super::{ConvState, Effect, Event, Phase};
use crate::actions::{ActionRequest, ActionResult};
use crate::history::{Turn, ERROR_REPLY};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Assistant is busy with the previous message")]
    AssistantBusy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O happens
/// in the runtime that executes the returned effects.
pub fn transition(state: &ConvState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User Messages
        // ============================================================
        (ConvState::Idle, Event::UserMessage { text }) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }
            let staged = vec![Turn::user(&text)];
            Ok(TransitionResult::new(ConvState::AwaitingModel {
                staged: staged.clone(),
            })
            .with_effect(Effect::display_user(&text))
            .with_effect(Effect::NotifyState {
                phase: Phase::AwaitingModel,
            })
            .with_effect(Effect::RequestModel { staged }))
        }

        (_, Event::UserMessage { .. }) => Err(TransitionError::AssistantBusy),

        // ============================================================
        // Reset
        // ============================================================
        (ConvState::Idle, Event::Reset) => Ok(TransitionResult::new(ConvState::Idle)
            .with_effect(Effect::ResetHistory)
            .with_effect(Effect::NotifyState { phase: Phase::Idle })),

        (_, Event::Reset) => Err(TransitionError::AssistantBusy),

        // ============================================================
        // Model Responses
        // ============================================================
        (
            ConvState::AwaitingModel { staged },
            Event::ModelResponse {
                text,
                action_requests,
            },
        ) => {
            let mut staged = staged.clone();

            if let Some((first, rest)) = action_requests.split_first() {
                // Any text alongside action requests is dropped; the follow-up carries the reply
                staged.push(Turn::action_requests(action_requests.clone()));
                return Ok(dispatch(staged, first.clone(), rest.to_vec()));
            }

            match text {
                Some(text) => {
                    staged.push(Turn::assistant(&text));
                    Ok(finish(staged).with_effects(reply(&text)))
                }
                // Nothing to show: the turn ends without touching the history
                None => Ok(TransitionResult::new(ConvState::Idle).with_effects(idle_effects())),
            }
        }

        (
            ConvState::AwaitingFollowUp { staged, remaining },
            Event::ModelResponse { text, .. },
        ) => {
            // Action requests in a follow-up are not dispatched; the runtime logs them
            let mut staged = staged.clone();
            let mut effects = vec![];
            if let Some(text) = text {
                staged.push(Turn::assistant(&text));
                effects.extend(reply(&text));
            }

            let result = match remaining.split_first() {
                Some((next, rest)) => dispatch(staged, next.clone(), rest.to_vec()),
                None => finish(staged),
            };
            // Replies are shown before the next action starts
            effects.extend(result.effects);
            Ok(TransitionResult {
                new_state: result.new_state,
                effects,
            })
        }

        (
            ConvState::AwaitingModel { staged } | ConvState::AwaitingFollowUp { staged, .. },
            Event::ModelError { message },
        ) => {
            // Keep only the utterance; a partially executed batch never reaches the history
            let mut turns: Vec<Turn> = staged.first().cloned().into_iter().collect();
            turns.push(Turn::assistant(ERROR_REPLY));
            Ok(TransitionResult::new(ConvState::Idle)
                .with_effect(Effect::NotifyError { message })
                .with_effect(Effect::CommitTurns { turns })
                .with_effects(reply(ERROR_REPLY))
                .with_effects(idle_effects()))
        }

        // ============================================================
        // Action Completion
        // ============================================================
        (
            ConvState::Dispatching {
                staged,
                current,
                remaining,
            },
            Event::ActionComplete { result },
        ) if result.action_name == current.name => Ok(await_follow_up(
            staged.clone(),
            result,
            remaining.clone(),
        )),

        // ============================================================
        // Everything else
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {}",
            event.name(),
            state.name()
        ))),
    }
}

fn dispatch(
    staged: Vec<Turn>,
    current: ActionRequest,
    remaining: Vec<ActionRequest>,
) -> TransitionResult {
    TransitionResult::new(ConvState::Dispatching {
        staged,
        current: current.clone(),
        remaining,
    })
    .with_effect(Effect::NotifyState {
        phase: Phase::Dispatching,
    })
    .with_effect(Effect::ExecuteAction { request: current })
}

fn await_follow_up(
    mut staged: Vec<Turn>,
    result: ActionResult,
    remaining: Vec<ActionRequest>,
) -> TransitionResult {
    staged.push(Turn::action_result(result));
    TransitionResult::new(ConvState::AwaitingFollowUp {
        staged: staged.clone(),
        remaining,
    })
    .with_effect(Effect::NotifyState {
        phase: Phase::AwaitingModel,
    })
    .with_effect(Effect::RequestModel { staged })
}

fn finish(staged: Vec<Turn>) -> TransitionResult {
    TransitionResult::new(ConvState::Idle)
        .with_effect(Effect::CommitTurns { turns: staged })
        .with_effects(idle_effects())
}

fn reply(text: &str) -> [Effect; 2] {
    [Effect::display_assistant(text), Effect::speak(text)]
}

fn idle_effects() -> [Effect; 2] {
    [Effect::NotifyState { phase: Phase::Idle }, Effect::TurnComplete]
}
