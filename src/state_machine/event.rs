//! Events that drive the assistant

use crate::actions::{ActionRequest, ActionResult};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    UserMessage {
        text: String,
    },
    Reset,

    // Model events
    ModelResponse {
        text: Option<String>,
        /// In the order the model emitted them
        action_requests: Vec<ActionRequest>,
    },
    ModelError {
        message: String,
    },

    // Action events
    ActionComplete {
        result: ActionResult,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserMessage { .. } => "user_message",
            Event::Reset => "reset",
            Event::ModelResponse { .. } => "model_response",
            Event::ModelError { .. } => "model_error",
            Event::ActionComplete { .. } => "action_complete",
        }
    }
}
