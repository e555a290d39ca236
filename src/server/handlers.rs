use crate::{
    llm::ChatCompletionRequest,
    relay::{ChatRequest, ChatResponse, HealthStatus, ModelsResponse, Relay, StatusResponse},
};
use axum::{
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use futures::StreamExt;
use std::{convert::Infallible, sync::Arc};
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<Relay>,
}

type Rejection = (StatusCode, Json<ChatResponse>);

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.relay.health())
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(state.relay.list_models().await)
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.relay.status().await)
}

pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, Rejection> {
    let request = prepare(&state, payload)?;

    Ok(Json(state.relay.chat(request).await))
}

pub async fn stream(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, Rejection> {
    let request = prepare(&state, payload)?;

    let frames = state
        .relay
        .stream_chat(request)
        .map(|event| Ok::<_, Infallible>(event.to_sse_frame()));

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(frames),
    )
        .into_response())
}

/// Rejects unreadable bodies and empty messages before the backend is called.
fn prepare(
    state: &AppState,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<ChatCompletionRequest, Rejection> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected chat request body: {}", rejection.body_text());
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ChatResponse::failed(format!(
                "Invalid JSON body: {}",
                rejection.body_text()
            ))),
        )
    })?;

    state.relay.prepare(request).map_err(|e| {
        warn!("Rejected chat request: {}", e);
        (StatusCode::BAD_REQUEST, Json(ChatResponse::failed(e.to_string())))
    })
}
