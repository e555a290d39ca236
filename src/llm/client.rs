use super::{OllamaClient, OpenAiClient, types::*};
use crate::{
    Result,
    config::{LlmConfig, LlmProvider},
};
use async_trait::async_trait;
use std::sync::Arc;

/// The inference backend as seen by the relay: list models, complete a
/// conversation, or stream a completion.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelInfo>>;

    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse>;

    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionStream>;
}

pub fn create_llm_client(config: &LlmConfig) -> Arc<dyn LlmClient> {
    match config.provider {
        LlmProvider::Ollama => Arc::new(OllamaClient::new(config)),
        LlmProvider::Openai => Arc::new(OpenAiClient::new(config)),
    }
}
