use super::{client::LlmClient, types::*};
use crate::{Error, Result, config::LlmConfig};
use async_openai::{Client, config::OpenAIConfig, error::OpenAIError, types as openai_types};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tracing::debug;

/// Client for OpenAI-compatible endpoints, including Ollama's `/v1` API.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());

        if !config.base_url.is_empty() {
            openai_config = openai_config.with_api_base(config.base_url.clone());
        }

        Self {
            client: Client::with_config(openai_config),
        }
    }

    fn build_request(
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<openai_types::CreateChatCompletionRequest> {
        let mut messages = Vec::with_capacity(request.messages.len());
        for msg in &request.messages {
            messages.push(msg.to_openai_message()?);
        }

        let mut request_builder = openai_types::CreateChatCompletionRequestArgs::default();
        request_builder.model(&request.model).messages(messages);

        if stream {
            request_builder.stream(true);
        }

        Ok(request_builder.build()?)
    }
}

/// API errors carry the backend's own message; keep it unwrapped.
fn map_openai_error(err: OpenAIError) -> Error {
    match err {
        OpenAIError::ApiError(api_error) => Error::llm(api_error.message),
        other => Error::from(other),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self.client.models().list().await.map_err(map_openai_error)?;

        debug!("Endpoint reported {} models", response.data.len());

        Ok(response
            .data
            .into_iter()
            .map(|model| {
                json!({
                    "name": model.id,
                    "model": model.id,
                    "created": model.created,
                    "owned_by": model.owned_by,
                })
            })
            .collect())
    }

    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        debug!(
            "Creating chat completion with {} messages for model {}",
            request.messages.len(),
            request.model
        );

        let openai_request = Self::build_request(&request, false)?;
        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(map_openai_error)?;

        debug!(
            "Received chat completion response with {} choices",
            response.choices.len()
        );

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(ChatCompletionResponse {
            model: response.model,
            message: ChatMessage::assistant(content),
        })
    }

    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionStream> {
        debug!(
            "Opening chat completion stream with {} messages for model {}",
            request.messages.len(),
            request.model
        );

        let openai_request = Self::build_request(&request, true)?;
        let stream = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(map_openai_error)?;

        let content = stream.map(|item| {
            item.map(|response| {
                response
                    .choices
                    .into_iter()
                    .filter_map(|choice| choice.delta.content)
                    .collect::<String>()
            })
            .map_err(map_openai_error)
        });

        Ok(Box::pin(content))
    }
}
