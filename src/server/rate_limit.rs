use crate::config::RateLimitConfig;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde_json::json;
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

const LIMITED_MESSAGE: &str = "Too many chatbot requests. Please try again later.";

/// Expired windows are swept once this many clients are tracked.
const PRUNE_THRESHOLD: usize = 10_000;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32, reset: Duration },
    Limited { reset: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client IP.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        debug!(
            "Rate limiting proxy routes to {} requests per {}s",
            config.max_requests, config.window_secs
        );
        Self {
            windows: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, client: IpAddr) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: IpAddr, now: Instant) -> RateLimitDecision {
        if self.windows.len() >= PRUNE_THRESHOLD && !self.windows.contains_key(&client) {
            self.prune(now);
        }

        let mut window = self.windows.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }

        let reset = self
            .window
            .saturating_sub(now.saturating_duration_since(window.started));
        if window.count >= self.max_requests {
            return RateLimitDecision::Limited { reset };
        }

        window.count += 1;
        RateLimitDecision::Allowed {
            remaining: self.max_requests - window.count,
            reset,
        }
    }

    fn prune(&self, now: Instant) {
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.started) < self.window);
    }
}

/// Rejects clients over their quota with HTTP 429 before the handler runs.
pub async fn limit_requests(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    match limiter.check(client) {
        RateLimitDecision::Allowed { remaining, reset } => {
            let mut response = next.run(request).await;
            insert_quota_headers(response.headers_mut(), limiter.max_requests(), remaining, reset);
            response
        }
        RateLimitDecision::Limited { reset } => {
            warn!("Rate limit exceeded for {} on {}", client, request.uri().path());
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "success": false, "message": LIMITED_MESSAGE })),
            )
                .into_response();
            let headers = response.headers_mut();
            insert_quota_headers(headers, limiter.max_requests(), 0, reset);
            headers.insert(
                axum::http::header::RETRY_AFTER,
                HeaderValue::from(whole_seconds(reset)),
            );
            response
        }
    }
}

/// Peer address of the connection. Requests served without connection info
/// share one bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn insert_quota_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: Duration) {
    headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(limit));
    headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
    headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(whole_seconds(reset)));
}

fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
