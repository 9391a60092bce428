//! Application actions the assistant can call
//!
//! Actions are stateless singletons; everything they touch arrives through
//! [`ActionContext`]. The registry validates arguments against each action's
//! schema before dispatch, so a malformed or unknown request becomes a failure
//! outcome for the model rather than an error for the caller.

mod create_listing;
mod navigate;
mod schema;

pub use create_listing::{CreateListingAction, CREATE_LISTING};
pub use navigate::{NavigateAction, Navigator, Screen, NAVIGATE};
pub use schema::{ActionDescriptor, ParameterSchema, PropertySpec, SchemaViolation};

use crate::llm::ToolDefinition;
use crate::market::Marketplace;
use crate::store::ProfileStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A call the model asked for, exactly as received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }

    /// Build from model output; non-object arguments are treated as empty
    pub fn from_tool_use(name: &str, input: &Value) -> Self {
        Self::new(name, input.as_object().cloned().unwrap_or_default())
    }
}

/// Outcome of one action, fed back to the model as text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_name: String,
    pub outcome: String,
    pub succeeded: bool,
}

impl ActionResult {
    pub fn success(action_name: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            outcome: outcome.into(),
            succeeded: true,
        }
    }

    pub fn failure(action_name: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            outcome: outcome.into(),
            succeeded: false,
        }
    }
}

/// Everything an action may read or change
#[derive(Clone)]
pub struct ActionContext {
    pub profiles: Arc<dyn ProfileStore>,
    pub marketplace: Arc<Marketplace>,
    pub navigator: Navigator,
}

/// An action the model can invoke
#[async_trait]
pub trait Action: Send + Sync {
    fn descriptor(&self) -> ActionDescriptor;

    /// Run with arguments already validated against `descriptor()`
    async fn run(&self, arguments: Value, ctx: &ActionContext) -> ActionResult;
}

/// The fixed set of actions advertised to the model
pub struct ActionRegistry {
    actions: Vec<(ActionDescriptor, Arc<dyn Action>)>,
}

impl ActionRegistry {
    pub fn standard() -> Self {
        let actions: Vec<Arc<dyn Action>> =
            vec![Arc::new(NavigateAction), Arc::new(CreateListingAction)];
        Self {
            actions: actions
                .into_iter()
                .map(|action| (action.descriptor(), action))
                .collect(),
        }
    }

    /// Tool definitions for the model request
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.actions
            .iter()
            .map(|(d, _)| d.to_tool_definition())
            .collect()
    }

    /// Validate and run one request. Never fails: problems become failure outcomes.
    pub async fn execute(&self, request: &ActionRequest, ctx: &ActionContext) -> ActionResult {
        let Some((descriptor, action)) = self
            .actions
            .iter()
            .find(|(d, _)| d.name == request.name)
        else {
            tracing::warn!(action = %request.name, "Model requested unknown action");
            let known: Vec<&str> = self.actions.iter().map(|(d, _)| d.name.as_str()).collect();
            return ActionResult::failure(
                &request.name,
                format!(
                    "Unknown action '{}'. Available actions: {}.",
                    request.name,
                    known.join(", ")
                ),
            );
        };

        if let Err(violation) = descriptor.parameters.validate(&request.arguments) {
            tracing::warn!(action = %request.name, %violation, "Action arguments rejected");
            return ActionResult::failure(
                &request.name,
                format!("Invalid arguments for {}: {violation}.", request.name),
            );
        }

        let result = action
            .run(Value::Object(request.arguments.clone()), ctx)
            .await;
        tracing::info!(
            action = %request.name,
            succeeded = result.succeeded,
            outcome = %result.outcome,
            "Action executed"
        );
        result
    }
}
