mod client;
mod ollama;
mod openai;
mod types;

pub use client::{LlmClient, create_llm_client};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use types::*;
