use super::{client::LlmClient, types::*};
use crate::{Error, Result, config::LlmConfig};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Client for Ollama's native HTTP API.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// One `/api/chat` reply, or one line of a streamed reply.
#[derive(Debug, Deserialize)]
struct OllamaChatChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaErrorBody {
    error: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Self {
        debug!("Creating Ollama client for: {}", config.base_url);

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send_chat(&self, request: &ChatCompletionRequest, stream: bool) -> Result<reqwest::Response> {
        let body = OllamaChatRequest {
            model: &request.model,
            messages: &request.messages,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint("/api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response)
    }
}

/// Ollama reports failures as `{"error": "..."}`; that text becomes the error message.
async fn error_from_response(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<OllamaErrorBody>(&body) {
        Ok(parsed) => Error::llm(parsed.error),
        Err(_) if body.trim().is_empty() => Error::llm(format!("Ollama API returned {}", status)),
        Err(_) => Error::llm(format!("Ollama API returned {}: {}", status, body.trim())),
    }
}

fn parse_chunk(line: &[u8]) -> Result<Option<OllamaChatChunk>> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let chunk: OllamaChatChunk = serde_json::from_str(line)
        .map_err(|e| Error::llm(format!("Invalid response from Ollama: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(Error::llm(error));
    }

    Ok(Some(chunk))
}

/// Turns a newline-delimited JSON body into the assistant content it carries.
fn content_stream<S, B>(bytes: S) -> impl Stream<Item = Result<String>> + Send
where
    S: Stream<Item = reqwest::Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    async_stream::try_stream! {
        let mut bytes = Box::pin(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| Error::llm(format!("Ollama stream interrupted: {}", e)))?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if let Some(chunk) = parse_chunk(&line)? {
                    if let Some(message) = chunk.message {
                        yield message.content;
                    }
                    if chunk.done {
                        finished = true;
                        break 'read;
                    }
                }
            }
        }

        if !finished {
            if let Some(chunk) = parse_chunk(&buffer)? {
                if let Some(message) = chunk.message {
                    yield message.content;
                }
            }
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(self.endpoint("/api/tags"))
            .send()
            .await
            .map_err(|e| Error::llm(format!("Failed to reach Ollama: {}", e)))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Invalid response from Ollama: {}", e)))?;

        debug!("Ollama reported {} models", tags.models.len());

        Ok(tags.models)
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

        let response = self.send_chat(&request, false).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::llm(format!("Failed to read Ollama response: {}", e)))?;

        let chunk = parse_chunk(&body)?
            .ok_or_else(|| Error::llm("Empty response from Ollama"))?;

        let content = match chunk.message {
            Some(message) => message.content,
            None => {
                warn!("Ollama response for {} carried no message", request.model);
                String::new()
            }
        };

        Ok(ChatCompletionResponse {
            model: chunk.model.unwrap_or(request.model),
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

        let response = self.send_chat(&request, true).await?;

        Ok(Box::pin(content_stream(response.bytes_stream())))
    }
}
