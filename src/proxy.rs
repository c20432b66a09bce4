//! Edge proxy: relays `POST /api/chat` to the upstream inference service.
//!
//! The upstream body is piped back as a live byte stream. Nothing is buffered
//! beyond the chunk in flight, and the proxy keeps no state between requests.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::client::CHAT_PATH;
use crate::http::{add_extra_headers, build_http_client};
use crate::model::ErrorBody;
use crate::options::TransportOptions;

/// Content type used when the upstream does not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Protocol marker header, relayed only when the upstream sets it.
pub const DATA_STREAM_HEADER: &str = "x-vercel-ai-data-stream";

/// Errors produced while relaying a request.
///
/// Responses never carry the underlying detail; it is only logged.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream responded with {0}")]
    UpstreamStatus(StatusCode),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::UpstreamStatus(status) => {
                warn!("Backend error: {}", self);
                (*status, "Backend error")
            }
            ProxyError::InvalidBody(_) | ProxyError::Upstream(_) => {
                error!("Proxy error: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct ProxyState {
    http: reqwest::Client,
    upstream_url: Arc<str>,
    transport_options: Arc<TransportOptions>,
}

impl ProxyState {
    /// Create state for an upstream at `upstream_url` (scheme, host, port).
    pub fn new(
        upstream_url: impl AsRef<str>,
        transport_options: TransportOptions,
    ) -> Result<Self, reqwest::Error> {
        let http = build_http_client(&transport_options)?;
        Ok(Self {
            http,
            upstream_url: Arc::from(upstream_url.as_ref().trim_end_matches('/')),
            transport_options: Arc::new(transport_options),
        })
    }

    /// Upstream chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}{}", self.upstream_url, CHAT_PATH)
    }
}

/// Build the relay router with tracing and CORS layers.
pub fn router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(CHAT_PATH, post(chat))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn chat(State(state): State<ProxyState>, body: Bytes) -> Result<Response, ProxyError> {
    let body: serde_json::Value = serde_json::from_slice(&body)?;
    let url = state.chat_url();

    let mut req = state
        .http
        .post(&url)
        .header(CONTENT_TYPE, "application/json");
    req = add_extra_headers(req, &state.transport_options.extra_headers);

    let upstream = req.json(&body).send().await?;
    let status = upstream.status();
    if !status.is_success() {
        return Err(ProxyError::UpstreamStatus(status));
    }

    debug!(%url, "relaying upstream stream");
    Ok(relay(upstream))
}

/// Build the 200 response that pipes the upstream body through.
fn relay(upstream: reqwest::Response) -> Response {
    let headers = upstream.headers();
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let marker = headers.get(DATA_STREAM_HEADER).cloned();

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    response.headers_mut().insert(CONTENT_TYPE, content_type);
    if let Some(marker) = marker {
        response
            .headers_mut()
            .insert(HeaderName::from_static(DATA_STREAM_HEADER), marker);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_chat_url_trims_trailing_slash() {
        let state = ProxyState::new("http://localhost:8000/", TransportOptions::default()).unwrap();
        assert_eq!(state.chat_url(), "http://localhost:8000/api/chat");
    }

    #[tokio::test]
    async fn test_upstream_status_is_mirrored() {
        let response = ProxyError::UpstreamStatus(StatusCode::SERVICE_UNAVAILABLE).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Backend error"})
        );
    }

    #[tokio::test]
    async fn test_local_failure_hides_detail() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let response = ProxyError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Internal Server Error"})
        );
    }
}
