//! HTTP handlers and route table for the simulated endpoints.

use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::config::Parameters;
use crate::ratelimit::{Decision, RateLimiter};

/// Shared state behind every handler.
pub struct AppState {
    /// Endpoints with uniform limits, served under `/api`
    pub uniform: RateLimiter,
    /// Endpoints with randomized limits, served under `/api2`
    pub heterogeneous: RateLimiter,
    /// Configured uniform parameters, shown on the index page
    pub parameters: Parameters,
}

/// Build the route table.
///
/// `/drop` is deliberately absent: severing a connection is not something a
/// handler can express, so it is intercepted in the connection loop before
/// routing. See `http::server`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/api/{index}", get(uniform_endpoint))
        .route("/api2/{index}", get(heterogeneous_endpoint))
        .route("/api-500", get(server_error_endpoint))
        .fallback(fallback_redirect)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Success body for rate-limited endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndpointBody {
    index: usize,
    count: u32,
    last_request: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

/// Body accompanying a 429 response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThrottledBody {
    error: &'static str,
    retry_after_seconds: u64,
}

async fn uniform_endpoint(
    State(state): State<Arc<AppState>>,
    Path(index): Path<String>,
) -> Response {
    endpoint_response(&state.uniform, &index, false)
}

async fn heterogeneous_endpoint(
    State(state): State<Arc<AppState>>,
    Path(index): Path<String>,
) -> Response {
    endpoint_response(&state.heterogeneous, &index, true)
}

/// Parse the index segment, evaluate the request, and render the outcome.
///
/// Unparseable and out-of-range indices are 404s and never touch the table.
/// The randomized endpoints echo their own limits so callers can see what
/// they are up against.
fn endpoint_response(limiter: &RateLimiter, raw_index: &str, include_limits: bool) -> Response {
    let Ok(index) = raw_index.parse::<usize>() else {
        debug!(index = raw_index, "Unparseable endpoint index");
        return StatusCode::NOT_FOUND.into_response();
    };

    let now = Utc::now();
    match limiter.check(index, now) {
        None => {
            debug!(index, "Endpoint index out of range");
            StatusCode::NOT_FOUND.into_response()
        }
        Some(Decision::Accepted(snapshot)) => {
            let body = EndpointBody {
                index: snapshot.index,
                count: snapshot.count,
                last_request: snapshot.last_request,
                max_requests: include_limits.then_some(snapshot.max_requests),
                retry_after_seconds: include_limits.then_some(snapshot.retry_after_seconds),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Some(Decision::Rejected { retry_after_secs }) => throttled_response(retry_after_secs),
    }
}

/// Render a 429 with the retry hint in both the header and the body.
fn throttled_response(retry_after_secs: u64) -> Response {
    let body = ThrottledBody {
        error: "rate limit exceeded",
        retry_after_seconds: retry_after_secs,
    };
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
    response
}

async fn server_error_endpoint() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn fallback_redirect() -> Redirect {
    Redirect::temporary("/")
}

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index_page(&state))
}

/// Render the HTML index listing every simulated endpoint.
fn render_index_page(state: &AppState) -> String {
    let params = &state.parameters;

    let uniform_links = (0..state.uniform.len())
        .map(|index| format!(r#"        <li><a href="/api/{index}">/api/{index}</a></li>"#))
        .collect::<Vec<_>>()
        .join("\n");

    let heterogeneous_links = state
        .heterogeneous
        .iter_params()
        .map(|(index, limits)| {
            format!(
                r#"        <li><a href="/api2/{index}">/api2/{index}</a> (max {} requests, retry after {}s)</li>"#,
                limits.max_requests, limits.retry_after_seconds
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Throttlebox</title>
    <style>
        body {{ font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }}
        code {{ background: #f0f0f0; padding: 0 0.25rem; }}
    </style>
</head>
<body>
    <h1>Throttlebox</h1>
    <p>Simulated rate-limited endpoints for client testing. Each endpoint
    accepts up to its request limit, then answers <code>429</code> with a
    <code>Retry-After</code> header until the cooldown passes. An endpoint
    left idle for the same interval forgets its counter.</p>

    <h2>Uniform endpoints</h2>
    <p>{max_endpoints} endpoints sharing one limit: {max_requests} requests,
    retry after {retry_after_seconds}s.</p>
    <ul>
{uniform_links}
    </ul>

    <h2>Randomized endpoints</h2>
    <p>Each endpoint has its own limits, fixed at startup and echoed in its
    responses.</p>
    <ul>
{heterogeneous_links}
    </ul>

    <h2>Diagnostics</h2>
    <ul>
        <li><a href="/api-500">/api-500</a> always answers 500</li>
        <li><a href="/drop">/drop</a> closes the connection without a response</li>
    </ul>
</body>
</html>"#,
        max_endpoints = params.max_endpoints,
        max_requests = params.max_requests,
        retry_after_seconds = params.retry_after_seconds,
        uniform_links = uniform_links,
        heterogeneous_links = heterogeneous_links,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::LimitParams;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn test_state() -> Arc<AppState> {
        let parameters = Parameters {
            max_endpoints: 2,
            max_requests: 3,
            retry_after_seconds: 5,
            seed: Some(42),
        };
        let limits = LimitParams {
            max_requests: parameters.max_requests,
            retry_after_seconds: parameters.retry_after_seconds,
        };
        Arc::new(AppState {
            uniform: RateLimiter::uniform(parameters.max_endpoints, limits),
            heterogeneous: RateLimiter::heterogeneous(parameters.max_endpoints, parameters.seed),
            parameters,
        })
    }

    async fn send_get(router: &Router, uri: &str) -> Response {
        router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_accepted_request_reports_count() {
        let app = router(test_state());

        let response = send_get(&app, "/api/0").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["index"], 0);
        assert_eq!(body["count"], 1);
        assert!(body["lastRequest"].is_string());
        // Uniform endpoints do not echo their limits.
        assert!(body.get("maxRequests").is_none());
        assert!(body.get("retryAfterSeconds").is_none());
    }

    #[tokio::test]
    async fn test_burst_then_throttled_with_retry_after() {
        let app = router(test_state());

        for expected in 1..=3 {
            let response = send_get(&app, "/api/0").await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_json(response).await;
            assert_eq!(body["count"], expected);
        }

        let response = send_get(&app, "/api/0").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .cloned()
            .unwrap();
        assert_eq!(retry_after.to_str().unwrap(), "5");

        let body = body_json(response).await;
        assert_eq!(body["retryAfterSeconds"], 5);
        assert_eq!(body["error"], "rate limit exceeded");
    }

    #[tokio::test]
    async fn test_throttling_one_index_leaves_others_alone() {
        let app = router(test_state());

        for _ in 0..4 {
            send_get(&app, "/api/0").await;
        }
        let response = send_get(&app, "/api/0").await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let response = send_get(&app, "/api/1").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["count"], 1);
    }

    #[tokio::test]
    async fn test_randomized_endpoint_echoes_its_limits() {
        let app = router(test_state());

        let response = send_get(&app, "/api2/1").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["index"], 1);
        assert_eq!(body["count"], 1);
        let max_requests = body["maxRequests"].as_u64().unwrap();
        let retry_after = body["retryAfterSeconds"].as_u64().unwrap();
        assert!((5..=50).contains(&max_requests));
        assert!((2..=10).contains(&retry_after));
    }

    #[tokio::test]
    async fn test_unknown_index_is_not_found() {
        let app = router(test_state());

        for uri in ["/api/2", "/api/9999", "/api/banana", "/api/-1", "/api2/2"] {
            let response = send_get(&app, uri).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "uri: {uri}");
        }

        // None of the misses consumed any quota.
        let response = send_get(&app, "/api/0").await;
        assert_eq!(body_json(response).await["count"], 1);
    }

    #[tokio::test]
    async fn test_server_error_endpoint_always_fails() {
        let app = router(test_state());
        let response = send_get(&app, "/api-500").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_path_redirects_to_index() {
        let app = router(test_state());
        let response = send_get(&app, "/definitely/not/here").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");
    }

    #[tokio::test]
    async fn test_index_page_links_everything() {
        let app = router(test_state());

        let response = send_get(&app, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"));

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page = String::from_utf8(bytes.to_vec()).unwrap();
        for needle in ["/api/0", "/api/1", "/api2/0", "/api2/1", "/api-500", "/drop"] {
            assert!(page.contains(needle), "missing link: {needle}");
        }
    }
}
