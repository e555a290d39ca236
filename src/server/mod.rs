pub mod handlers;
pub mod rate_limit;

use crate::{
    Error, Result,
    config::{Config, ServerConfig},
    llm::create_llm_client,
    relay::{Relay, RelaySettings},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use handlers::AppState;
use rate_limit::RateLimiter;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

pub async fn run(config: Config) -> Result<()> {
    let client = create_llm_client(&config.llm);
    let relay = Arc::new(Relay::new(client, RelaySettings::from_config(&config)));

    tokio::spawn(probe_backend(Arc::clone(&relay)));

    let app = router(AppState { relay }, &config.server)?;

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

pub fn router(state: AppState, config: &ServerConfig) -> Result<Router> {
    let mut app = Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/models", get(handlers::list_models))
        .route("/api/chat", post(handlers::chat))
        .route("/api/stream", post(handlers::stream));

    let mut proxy = Router::new()
        .route("/api/ollama/chat", post(handlers::chat))
        .route("/api/ollama/stream", post(handlers::stream))
        .route("/api/ollama/chat/stream", post(handlers::stream));

    if config.rate_limit.enabled {
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
        proxy = proxy.route_layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::limit_requests,
        ));
    }

    app = app.merge(proxy);

    if config.status_endpoint {
        app = app.route("/status", get(handlers::status));
    }

    Ok(app
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors_layer(&config.allowed_origins)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

fn cors_layer(allowed_origins: &[String]) -> Result<CorsLayer> {
    // Credentials cannot be combined with a wildcard origin.
    if allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| Error::config(format!("Invalid allowed origin: '{}'", origin)))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

/// Logs which models the backend offers. Startup never depends on the outcome.
async fn probe_backend(relay: Arc<Relay>) {
    let status = relay.status().await;
    match (status.models, status.message) {
        (Some(models), _) if models.is_empty() => {
            warn!("Connected to the inference backend but no models are installed");
        }
        (Some(models), _) => {
            info!("Connected to the inference backend. Available models: {}", models.join(", "));
        }
        (None, message) => {
            error!(
                "Failed to connect to the inference backend: {}",
                message.unwrap_or_default()
            );
        }
    }
}
