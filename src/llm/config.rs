//! Provider configuration from the environment

use super::{GeminiService, LlmService, LoggingService};
use std::sync::Arc;

/// Default Gemini model for chat and advisors
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Configuration for the LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    /// Gateway base URL; when set the gateway authenticates and no key is sent
    pub gateway: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    /// Reads `GEMINI_API_KEY` (falling back to `API_KEY`), `LLM_GATEWAY` and `AGRI_MODEL`
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY")
                .or_else(|_| std::env::var("API_KEY"))
                .ok()
                .filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
            model: std::env::var("AGRI_MODEL").ok().filter(|m| !m.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Build the logging-wrapped service, or `None` when neither a key nor a
    /// gateway is configured
    pub fn build_service(&self) -> Option<Arc<dyn LlmService>> {
        if self.api_key.is_none() && self.gateway.is_none() {
            return None;
        }

        let api_key = self.api_key.clone().unwrap_or_default();
        match GeminiService::new(api_key, self.model(), self.gateway.as_deref()) {
            Ok(service) => Some(Arc::new(LoggingService::new(Arc::new(service)))),
            Err(e) => {
                tracing::error!(error = %e, "Failed to create Gemini service");
                None
            }
        }
    }
}
