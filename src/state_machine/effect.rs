//! Effects produced by state transitions

use super::Phase;
use crate::actions::ActionRequest;
use crate::history::{DisplayMessage, Turn};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Ask the model, sending the committed history followed by `staged`
    RequestModel { staged: Vec<Turn> },

    /// Run one action (spawns as background task)
    ExecuteAction { request: ActionRequest },

    /// Append a finished round trip to the shared history
    CommitTurns { turns: Vec<Turn> },

    /// Show a line of the transcript
    Display { message: DisplayMessage },

    /// Read a reply aloud in the current language
    Speak { text: String },

    /// Notify connected clients of a phase change
    NotifyState { phase: Phase },

    /// Surface a failure to connected clients
    NotifyError { message: String },

    /// The user turn is finished
    TurnComplete,

    /// Replace the history with the greeting
    ResetHistory,
}

impl Effect {
    pub fn display_user(text: &str) -> Self {
        Effect::Display {
            message: DisplayMessage::user(text),
        }
    }

    pub fn display_assistant(text: &str) -> Self {
        Effect::Display {
            message: DisplayMessage::assistant(text),
        }
    }

    pub fn speak(text: &str) -> Self {
        Effect::Speak {
            text: text.to_string(),
        }
    }
}
