mod events;
mod types;

pub use events::{StreamEvent, escape_event_text};
pub use types::*;

use crate::{
    Error, Result,
    config::Config,
    llm::{ChatCompletionRequest, ChatMessage, LlmClient, ModelInfo},
};
use futures::{Stream, StreamExt};
use std::{pin::Pin, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

pub type ChatEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

const LOGGED_MESSAGE_CHARS: usize = 30;

/// Immutable relay settings, built once at startup.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub system_prompt: String,
    pub default_model: String,
    pub service_name: Option<String>,
    pub stream_chunk_delay: Duration,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: config.llm.system_prompt().to_string(),
            default_model: config.llm.model.clone(),
            service_name: config.server.service_name.clone(),
            stream_chunk_delay: Duration::from_millis(config.server.stream_chunk_delay_ms),
        }
    }
}

/// Forwards chat requests to the inference backend. Holds no per-request state.
pub struct Relay {
    client: Arc<dyn LlmClient>,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(client: Arc<dyn LlmClient>, settings: RelaySettings) -> Self {
        Self { client, settings }
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "ok".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            service: self.settings.service_name.clone(),
        }
    }

    pub async fn list_models(&self) -> ModelsResponse {
        match self.client.list_models().await {
            Ok(models) => ModelsResponse::ok(models, self.settings.default_model.clone()),
            Err(e) => {
                warn!("Failed to list models: {}", e);
                ModelsResponse::failed(e.to_string())
            }
        }
    }

    pub async fn status(&self) -> StatusResponse {
        match self.client.list_models().await {
            Ok(models) => StatusResponse::ok(
                models.iter().filter_map(model_name).collect(),
                self.settings.default_model.clone(),
            ),
            Err(e) => {
                warn!("Status check failed: {}", e);
                StatusResponse::failed(e.to_string())
            }
        }
    }

    /// Validates the request and assembles the conversation sent to the backend.
    pub fn prepare(&self, request: ChatRequest) -> Result<ChatCompletionRequest> {
        let message = request
            .message
            .filter(|message| !message.is_empty())
            .ok_or_else(|| Error::validation("Message is required"))?;

        let model = request
            .model
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_model.clone());

        info!(
            "Sending message to {}: {}...",
            model,
            message.chars().take(LOGGED_MESSAGE_CHARS).collect::<String>()
        );

        Ok(ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage::system(self.settings.system_prompt.clone()),
                ChatMessage::user(message),
            ],
        })
    }

    pub async fn chat(&self, request: ChatCompletionRequest) -> ChatResponse {
        let model = request.model.clone();
        match self.client.create_chat_completion(request).await {
            Ok(response) => {
                info!(
                    "Response received from {}, length: {}",
                    model,
                    response.message.content.len()
                );
                ChatResponse::ok(response.message.content)
            }
            Err(e) => {
                error!("Chat completion with {} failed: {}", model, e);
                ChatResponse::failed(e.to_string())
            }
        }
    }

    /// Streams the completion as events. Exactly one terminal event is emitted,
    /// either `Done` or `Error`, and the stream ends right after it.
    pub fn stream_chat(&self, request: ChatCompletionRequest) -> ChatEventStream {
        let client = Arc::clone(&self.client);
        let delay = self.settings.stream_chunk_delay;

        Box::pin(async_stream::stream! {
            let model = request.model.clone();

            match client.create_chat_completion_stream(request).await {
                Err(e) => {
                    error!("Failed to open stream with {}: {}", model, e);
                    yield StreamEvent::Error(e.to_string());
                }
                Ok(mut fragments) => {
                    let mut emitted = 0usize;
                    let mut failed = false;

                    while let Some(fragment) = fragments.next().await {
                        match fragment {
                            Ok(content) => {
                                if content.is_empty() {
                                    continue;
                                }
                                emitted += 1;
                                yield StreamEvent::Content(content);
                                if !delay.is_zero() {
                                    tokio::time::sleep(delay).await;
                                }
                            }
                            Err(e) => {
                                error!("Stream from {} failed after {} fragments: {}", model, emitted, e);
                                failed = true;
                                yield StreamEvent::Error(e.to_string());
                                break;
                            }
                        }
                    }

                    if !failed {
                        debug!("Stream from {} finished with {} fragments", model, emitted);
                        yield StreamEvent::Done;
                    }
                }
            }
        })
    }
}

/// Ollama descriptors carry `name`; OpenAI-style ones only `id`.
fn model_name(model: &ModelInfo) -> Option<String> {
    model
        .get("name")
        .or_else(|| model.get("id"))
        .and_then(|name| name.as_str())
        .map(str::to_string)
}
