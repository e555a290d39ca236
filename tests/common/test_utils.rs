use super::MockLlmClient;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode},
};
use chat_relay::{
    config::{Config, LlmConfig, LlmProvider, LogsConfig, ServerConfig},
    relay::{Relay, RelaySettings},
    server::{self, handlers::AppState},
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

pub const TEST_SYSTEM_PROMPT: &str = "You are a helpful assistant for the school.";

/// Create a test configuration with sensible defaults
pub fn create_test_config() -> Config {
    Config {
        llm: LlmConfig {
            provider: LlmProvider::Ollama,
            base_url: "http://127.0.0.1:11434".to_string(),
            api_key: String::new(),
            model: "llama3.2:1b".to_string(),
            system_prompt: Some(TEST_SYSTEM_PROMPT.to_string()),
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5001,
            logs: LogsConfig {
                level: "debug".to_string(),
            },
            ..ServerConfig::default()
        },
    }
}

pub fn create_test_relay(mock: MockLlmClient, config: &Config) -> Arc<Relay> {
    Arc::new(Relay::new(Arc::new(mock), RelaySettings::from_config(config)))
}

pub fn create_test_app(mock: MockLlmClient) -> Router {
    create_test_app_with_config(mock, &create_test_config())
}

pub fn create_test_app_with_config(mock: MockLlmClient, config: &Config) -> Router {
    let relay = create_test_relay(mock, config);
    server::router(AppState { relay }, &config.server).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    post_raw(uri, "application/json", body.to_string())
}

pub fn post_raw(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

pub async fn send_text(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

pub async fn send_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, _, body) = send_text(app, request).await;
    let value = serde_json::from_str(&body)
        .unwrap_or_else(|e| panic!("Expected JSON body, got '{}': {}", body, e));
    (status, value)
}

/// Splits an event-stream body into its records, checking the framing on the way.
pub fn parse_sse_frames(body: &str) -> Vec<Value> {
    assert!(body.ends_with("\n\n"), "stream must end with a blank line: {:?}", body);

    body.split_terminator("\n\n")
        .map(|frame| {
            let data = frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("frame without data prefix: {:?}", frame));
            assert!(!data.contains('\n'), "frame spans several lines: {:?}", frame);
            serde_json::from_str(data)
                .unwrap_or_else(|e| panic!("frame is not JSON: {:?}: {}", data, e))
        })
        .collect()
}

/// Asserts the stream shape: content events, then exactly one terminal event.
pub fn assert_single_terminal(frames: &[Value]) {
    assert!(!frames.is_empty(), "stream produced no events");
    let (last, rest) = frames.split_last().unwrap();
    assert_eq!(last["done"], true, "last event must be terminal: {}", last);
    for frame in rest {
        assert_eq!(frame["done"], false, "terminal event before the end: {}", frame);
        assert!(frame.get("error").is_none(), "error before the end: {}", frame);
    }
}
