//! Conversation history
//!
//! The history is the canonical, append-only sequence of turns sent to the
//! model on every request. The runtime is its single writer; everyone else
//! reads snapshots. A whole round trip is committed with one
//! [`ConversationHistory::append_all`] call, so a reader sees either none or
//! all of it.

use crate::actions::{ActionRequest, ActionResult};
use crate::llm::{ContentBlock, LlmMessage};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

pub const GREETING: &str = "Namaskara! Naanu Agri-Sahayak. Krishi, marukatte, mathu beleya bagge naanu nimage sahaya madaballe.";

/// Fixed reply when the model cannot be reached
pub const ERROR_REPLY: &str = "Error connecting to AI.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Assistant,
    ActionResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TurnContent {
    Text(String),
    ActionRequests(Vec<ActionRequest>),
    ActionResults(Vec<ActionResult>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub content: TurnContent,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            content: TurnContent::Text(text.into()),
        }
    }

    pub fn action_requests(requests: Vec<ActionRequest>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            content: TurnContent::ActionRequests(requests),
        }
    }

    pub fn action_result(result: ActionResult) -> Self {
        Self {
            speaker: Speaker::ActionResult,
            content: TurnContent::ActionResults(vec![result]),
        }
    }

    /// Convert to the provider-neutral message format.
    ///
    /// Requests and results carry no ids: the provider pairs a result with the
    /// request of the same action name, in batch order.
    pub fn to_llm_message(&self) -> LlmMessage {
        match &self.content {
            TurnContent::Text(text) => match self.speaker {
                Speaker::User | Speaker::ActionResult => {
                    LlmMessage::user(vec![ContentBlock::text(text)])
                }
                Speaker::Assistant => LlmMessage::assistant(vec![ContentBlock::text(text)]),
            },
            TurnContent::ActionRequests(requests) => LlmMessage::assistant(
                requests
                    .iter()
                    .map(|r| {
                        ContentBlock::tool_use(
                            &r.name,
                            serde_json::Value::Object(r.arguments.clone()),
                        )
                    })
                    .collect(),
            ),
            TurnContent::ActionResults(results) => LlmMessage::user(
                results
                    .iter()
                    .map(|r| {
                        ContentBlock::tool_result(
                            &r.action_name,
                            &r.outcome,
                            !r.succeeded,
                        )
                    })
                    .collect(),
            ),
        }
    }
}

/// Who a transcript line belongs to. Action turns never reach the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplaySpeaker {
    User,
    Assistant,
}

/// A renderable line of the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub speaker: DisplaySpeaker,
    pub text: String,
}

impl DisplayMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: DisplaySpeaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: DisplaySpeaker::Assistant,
            text: text.into(),
        }
    }
}

/// Project text turns to display messages. Action turns are never shown.
pub fn display_messages(turns: &[Turn]) -> Vec<DisplayMessage> {
    turns
        .iter()
        .filter_map(|turn| match (&turn.content, turn.speaker) {
            (TurnContent::Text(text), Speaker::User) => Some(DisplayMessage::user(text)),
            (TurnContent::Text(text), Speaker::Assistant) => Some(DisplayMessage::assistant(text)),
            _ => None,
        })
        .collect()
}

/// Shared handle to the turn sequence
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    turns: Arc<RwLock<Vec<Turn>>>,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::with_greeting(GREETING)
    }
}

impl ConversationHistory {
    pub fn with_greeting(greeting: &str) -> Self {
        Self {
            turns: Arc::new(RwLock::new(vec![Turn::assistant(greeting)])),
        }
    }

    #[cfg(test)]
    pub fn append(&self, turn: Turn) {
        self.append_all(vec![turn]);
    }

    /// Append turns under one write lock
    pub fn append_all(&self, turns: Vec<Turn>) {
        if turns.is_empty() {
            return;
        }
        let mut guard = self.turns.write().unwrap_or_else(PoisonError::into_inner);
        guard.extend(turns);
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.turns.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Replace everything with a single greeting turn
    pub fn reset(&self, greeting: &str) {
        let mut guard = self.turns.write().unwrap_or_else(PoisonError::into_inner);
        *guard = vec![Turn::assistant(greeting)];
    }
}
