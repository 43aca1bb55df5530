//! Language model integration.
//!
//! A client is created per invocation from the caller's model name and API key
//! and handed explicitly to every step that needs it.

pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use openai::{OpenAiClient, OpenAiConfig};
pub use parser::extract_sql;
pub use prompt::{build_agent_system_prompt, build_synthesis_prompt, build_text_to_sql_prompt};
pub use types::{LlmResponse, Message, Role, ToolCall, ToolDefinition, ToolResult};

use async_trait::async_trait;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::LlmConfig;
use crate::models::ModelName;

/// Trait for language model clients.
///
/// Implementations must be thread-safe (Send + Sync) to support async operations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-prompt completion, returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, AppError>;

    /// One turn of a tool-calling conversation.
    async fn complete_with_tools(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, AppError>;

    /// Model this client talks to.
    fn model(&self) -> ModelName;
}

/// Builds invocation-scoped clients from caller credentials.
pub trait LlmClientFactory: Send + Sync {
    fn create(&self, model: ModelName, api_key: &str) -> Result<Arc<dyn LlmClient>, AppError>;
}

/// Factory for OpenAI clients sharing one base URL and timeout.
#[derive(Debug, Clone)]
pub struct OpenAiClientFactory {
    api_base_url: String,
    timeout_secs: u64,
}

impl OpenAiClientFactory {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

impl LlmClientFactory for OpenAiClientFactory {
    fn create(&self, model: ModelName, api_key: &str) -> Result<Arc<dyn LlmClient>, AppError> {
        if api_key.trim().is_empty() {
            return Err(AppError::Configuration(
                "No LLM provider API key was supplied".to_string(),
            ));
        }

        let config = OpenAiConfig::new(api_key, model)
            .with_base_url(self.api_base_url.clone())
            .with_timeout(self.timeout_secs);
        Ok(Arc::new(OpenAiClient::new(config)?))
    }
}
