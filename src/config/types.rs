use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: LlmProvider,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    /// Model used when a chat request does not name one.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Ollama,
    #[serde(alias = "openai_compatible")]
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_service_name")]
    pub service_name: Option<String>,
    #[serde(default = "default_true")]
    pub status_endpoint: bool,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Pause after each streamed fragment. Zero disables pacing.
    #[serde(default)]
    pub stream_chunk_delay_ms: u64,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub logs: LogsConfig,
}

/// Per-client request quota for the `/api/ollama/*` proxy routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rate_limit_max_requests")]
    pub max_requests: u32,
    #[serde(default = "default_rate_limit_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant for the St. Aiden & Chad Russian Orthodox School in Nottingham, UK.
Founded in 2024, the school teaches Russian language, Russian literature, music (Solfège), and Закон Божий (Law of God).

The school's teachers include:
- Father Gregory (Headmaster)
- Alexander Ushakov (Закон Божий teacher, graduated from St. Tikhon University in Moscow in Theology)
- Alla Ushakova (Music teacher with 20+ years experience teaching Solfège to children aged 4-10)
- Tatyana Ball (Russian language and literature for older classes)
- Alina (Russian language and literature for younger classes)
- Lydia Mikhalovna (Russian language and literature for middle classes, 40+ years experience)

The school is associated with the Nottingham Russian Orthodox Church of St. Aiden & Chad.

Provide accurate, helpful information about the school, Orthodox education, school programs,
and general inquiries. Keep responses respectful, educational, and appropriate for all ages.
Be concise yet thorough in your responses.";

impl LlmConfig {
    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            api_key: String::new(),
            model: default_model(),
            system_prompt: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            service_name: default_service_name(),
            status_endpoint: true,
            allowed_origins: default_allowed_origins(),
            max_body_bytes: default_max_body_bytes(),
            stream_chunk_delay_ms: 0,
            rate_limit: RateLimitConfig::default(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_rate_limit_max_requests(),
            window_secs: default_rate_limit_window_secs(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_provider() -> LlmProvider {
    LlmProvider::Ollama
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_service_name() -> Option<String> {
    Some("ollama-api".to_string())
}

fn default_true() -> bool {
    true
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3009".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

fn default_max_body_bytes() -> usize {
    100 * 1024
}

fn default_rate_limit_max_requests() -> u32 {
    50
}

fn default_rate_limit_window_secs() -> u64 {
    60 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}
