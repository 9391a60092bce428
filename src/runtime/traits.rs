//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::actions::{ActionContext, ActionRegistry, ActionRequest, ActionResult};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, ToolDefinition};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Executor for actions
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Run one action. Failures are reported in the result, never as errors.
    async fn execute(&self, request: &ActionRequest) -> ActionResult;

    /// Action definitions for the model
    fn definitions(&self) -> Vec<ToolDefinition>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

#[async_trait]
impl<T: ActionExecutor + ?Sized> ActionExecutor for Arc<T> {
    async fn execute(&self, request: &ActionRequest) -> ActionResult {
        (**self).execute(request).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use an optional `LlmService` as `LlmClient`
///
/// Without a configured service every request fails, which the assistant
/// turns into its fixed error reply.
#[derive(Clone)]
pub struct ServiceLlmClient {
    service: Option<Arc<dyn LlmService>>,
    model_id: String,
}

impl ServiceLlmClient {
    pub fn new(service: Option<Arc<dyn LlmService>>) -> Self {
        let model_id = service
            .as_ref()
            .map_or_else(|| "none".to_string(), |s| s.model_id().to_string());
        Self { service, model_id }
    }
}

#[async_trait]
impl LlmClient for ServiceLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .service
            .as_ref()
            .ok_or_else(|| LlmError::network("No LLM available"))?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Adapter to use `ActionRegistry` as `ActionExecutor`
pub struct RegistryExecutor {
    registry: ActionRegistry,
    ctx: ActionContext,
}

impl RegistryExecutor {
    pub fn new(registry: ActionRegistry, ctx: ActionContext) -> Self {
        Self { registry, ctx }
    }
}

#[async_trait]
impl ActionExecutor for RegistryExecutor {
    async fn execute(&self, request: &ActionRequest) -> ActionResult {
        self.registry.execute(request, &self.ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}
