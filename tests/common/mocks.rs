use async_trait::async_trait;
use chat_relay::{
    Error, Result,
    llm::{
        ChatCompletionRequest, ChatCompletionResponse, ChatCompletionStream, ChatMessage,
        LlmClient, ModelInfo,
    },
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// One item the mock stream yields: a fragment, or a backend failure.
#[derive(Debug, Clone)]
pub enum MockFragment {
    Content(String),
    Fail(String),
}

/// Mock inference backend for testing
#[derive(Debug, Clone)]
pub struct MockLlmClient {
    pub models: Vec<ModelInfo>,
    pub response: String,
    pub fragments: Vec<MockFragment>,
    pub missing_models: Vec<String>,
    pub error: Option<String>,
    pub requests: Arc<Mutex<Vec<ChatCompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            models: vec![
                json!({"name": "llama3.2:1b", "size": 1321098329}),
                json!({"name": "mistral:latest", "size": 4113301824u64}),
            ],
            response: "The school teaches Russian language, literature, music and Закон Божий."
                .to_string(),
            fragments: vec![
                MockFragment::Content("The school ".to_string()),
                MockFragment::Content("teaches music.".to_string()),
            ],
            missing_models: Vec::new(),
            error: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_models(mut self, models: Vec<ModelInfo>) -> Self {
        self.models = models;
        self
    }

    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    pub fn with_fragments(mut self, fragments: &[&str]) -> Self {
        self.fragments = fragments
            .iter()
            .map(|f| MockFragment::Content(f.to_string()))
            .collect();
        self
    }

    /// Appends a failure after the configured fragments.
    pub fn with_stream_failure(mut self, error: &str) -> Self {
        self.fragments.push(MockFragment::Fail(error.to_string()));
        self
    }

    /// Requests naming this model fail with "model not found".
    pub fn with_missing_model(mut self, model: &str) -> Self {
        self.missing_models.push(model.to_string());
        self
    }

    /// Every call fails, as if the backend were down.
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }

    pub fn get_requests(&self) -> Vec<ChatCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn check(&self, request: &ChatCompletionRequest) -> Result<()> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(ref error) = self.error {
            return Err(Error::llm(error.clone()));
        }
        if self.missing_models.contains(&request.model) {
            return Err(Error::llm("model not found"));
        }
        Ok(())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        if let Some(ref error) = self.error {
            return Err(Error::llm(error.clone()));
        }
        Ok(self.models.clone())
    }

    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse> {
        self.check(&request)?;

        Ok(ChatCompletionResponse {
            model: request.model,
            message: ChatMessage::assistant(self.response.clone()),
        })
    }

    async fn create_chat_completion_stream(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionStream> {
        self.check(&request)?;

        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .map(|fragment| match fragment {
                MockFragment::Content(content) => Ok(content.clone()),
                MockFragment::Fail(error) => Err(Error::llm(error.clone())),
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(items)))
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}
