//! Assistant state

use crate::actions::ActionRequest;
use crate::history::Turn;
use serde::Serialize;

/// Where the current user turn is in its round trip.
///
/// Every non-idle state carries the turns staged so far. The first staged
/// turn is always the user's utterance. Nothing reaches the shared history
/// until the round trip finishes.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConvState {
    /// Ready for a new utterance
    #[default]
    Idle,

    /// Waiting for the model's answer to the utterance
    AwaitingModel { staged: Vec<Turn> },

    /// Running one requested action
    Dispatching {
        staged: Vec<Turn>,
        current: ActionRequest,
        remaining: Vec<ActionRequest>,
    },

    /// Waiting for the model's reply to an action result
    AwaitingFollowUp {
        staged: Vec<Turn>,
        remaining: Vec<ActionRequest>,
    },
}

/// Coarse phase reported to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AwaitingModel,
    Dispatching,
}

impl ConvState {
    pub fn phase(&self) -> Phase {
        match self {
            ConvState::Idle => Phase::Idle,
            ConvState::AwaitingModel { .. } | ConvState::AwaitingFollowUp { .. } => {
                Phase::AwaitingModel
            }
            ConvState::Dispatching { .. } => Phase::Dispatching,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ConvState::Idle)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConvState::Idle => "idle",
            ConvState::AwaitingModel { .. } => "awaiting_model",
            ConvState::Dispatching { .. } => "dispatching",
            ConvState::AwaitingFollowUp { .. } => "awaiting_follow_up",
        }
    }
}
