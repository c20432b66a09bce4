//! Integration tests for the edge proxy using wiremock as the upstream.

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use chatrelay::options::TransportOptions;
use chatrelay::proxy::{router, ProxyState, DEFAULT_CONTENT_TYPE};
use tower::ServiceExt;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATA_STREAM_BODY: &str = "0:\"Hello \"\n0:\"world!\"\nd:{\"finishReason\":\"stop\"}\n";

fn chat_body() -> serde_json::Value {
    serde_json::json!({
        "messages": [
            {"role": "user", "content": "Hello"},
            {"role": "assistant", "content": "Hi! Ask me anything."},
            {"role": "user", "content": "caf\u{e9} \"quoted\"\nnext line"}
        ]
    })
}

fn app(upstream: &str) -> Router {
    router(ProxyState::new(upstream, TransportOptions::default()).expect("valid state"))
}

fn chat_request(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(CONTENT_TYPE, "application/json")
        .body(body.into())
        .expect("valid request")
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

#[tokio::test]
async fn relays_stream_and_forwards_body_verbatim() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(header("content-type", "application/json"))
        .and(body_json(chat_body()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(DATA_STREAM_BODY, "text/plain; charset=utf-8")
                .insert_header("x-vercel-ai-data-stream", "v1"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let response = app(&upstream.uri())
        .oneshot(chat_request(chat_body().to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/plain; charset=utf-8");
    assert_eq!(response.headers()["x-vercel-ai-data-stream"], "v1");
    assert_eq!(body_string(response).await, DATA_STREAM_BODY);
}

#[tokio::test]
async fn defaults_content_type_and_omits_absent_marker() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(DATA_STREAM_BODY.as_bytes()))
        .mount(&upstream)
        .await;

    let response = app(&upstream.uri())
        .oneshot(chat_request(chat_body().to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], DEFAULT_CONTENT_TYPE);
    assert!(response.headers().get("x-vercel-ai-data-stream").is_none());
}

#[tokio::test]
async fn mirrors_upstream_error_status_without_body() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(503).set_body_string("model server overloaded: gpu-7 OOM"),
        )
        .expect(1)
        .mount(&upstream)
        .await;

    let response = app(&upstream.uri())
        .oneshot(chat_request(chat_body().to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value =
        serde_json::from_str(&body_string(response).await).expect("json error body");
    assert_eq!(body, serde_json::json!({"error": "Backend error"}));
}

#[tokio::test]
async fn unreachable_upstream_is_generic_500() {
    let response = app("http://127.0.0.1:1")
        .oneshot(chat_request(chat_body().to_string()))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert_eq!(body, r#"{"error":"Internal Server Error"}"#);
}

#[tokio::test]
async fn invalid_json_body_is_generic_500() {
    let upstream = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let response = app(&upstream.uri())
        .oneshot(chat_request("{\"messages\": ["))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn only_post_is_routed() {
    let response = app("http://127.0.0.1:1")
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/chat")
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
