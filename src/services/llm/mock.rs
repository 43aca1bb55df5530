//! Scripted LLM client for testing.
//!
//! Replies are consumed in order; every prompt and tool conversation is
//! recorded so tests can assert on what the model was asked.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::middleware::AppError;
use crate::models::ModelName;

use super::types::{LlmResponse, Message, ToolDefinition};
use super::{LlmClient, LlmClientFactory};

#[derive(Default)]
pub struct MockLlmClient {
    completions: Mutex<VecDeque<Result<String, AppError>>>,
    tool_turns: Mutex<VecDeque<LlmResponse>>,
    prompts: Mutex<Vec<String>>,
    conversations: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `complete`.
    pub fn with_completion(self, reply: impl Into<String>) -> Self {
        self.completions.lock().unwrap().push_back(Ok(reply.into()));
        self
    }

    /// Queue a failure for `complete`.
    pub fn with_failure(self, error: AppError) -> Self {
        self.completions.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queue a reply for `complete_with_tools`.
    pub fn with_tool_turn(self, response: LlmResponse) -> Self {
        self.tool_turns.lock().unwrap().push_back(response);
        self
    }

    /// Make every call sleep first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts passed to `complete`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn complete_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Message lists passed to `complete_with_tools`, in call order.
    pub fn conversations(&self) -> Vec<Vec<Message>> {
        self.conversations.lock().unwrap().clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, AppError> {
        self.pause().await;
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LlmService("No scripted completion left".to_string())))
    }

    async fn complete_with_tools(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<LlmResponse, AppError> {
        self.pause().await;
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.tool_turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::LlmService("No scripted tool turn left".to_string()))
    }

    fn model(&self) -> ModelName {
        ModelName::default()
    }
}

/// Factory handing out one shared scripted client.
pub struct MockLlmFactory {
    client: Arc<MockLlmClient>,
    requested: Mutex<Vec<(ModelName, String)>>,
}

impl MockLlmFactory {
    pub fn new(client: Arc<MockLlmClient>) -> Self {
        Self {
            client,
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Model names and API keys clients were requested with.
    pub fn requested(&self) -> Vec<(ModelName, String)> {
        self.requested.lock().unwrap().clone()
    }
}

impl LlmClientFactory for MockLlmFactory {
    fn create(&self, model: ModelName, api_key: &str) -> Result<Arc<dyn LlmClient>, AppError> {
        self.requested.lock().unwrap().push((model, api_key.to_string()));
        Ok(self.client.clone())
    }
}
