//! Client-side transport seam and error types.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

use crate::http::{add_extra_headers, build_http_client};
use crate::model::ChatRequest;
use crate::options::TransportOptions;

/// Path of the chat endpoint, both on the proxy and on the upstream.
pub const CHAT_PATH: &str = "/api/chat";

/// Errors that can occur during client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request failed with status {0}")]
    Status(reqwest::StatusCode),

    #[error("A response is already streaming")]
    Busy,

    #[error("Message is empty")]
    EmptyInput,

    #[error("Request cancelled before the response finished")]
    Cancelled,

    /// Transport-level I/O failure from a non-HTTP `ChatTransport`.
    #[error("Stream error: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw response body of a chat request, chunked as it arrived on the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Something that can open a streaming chat response.
///
/// `open` resolves once response headers are in; a non-success status is an
/// error and no body is returned. The body is consumed lazily through the
/// returned stream.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ClientError>;
}

/// HTTP transport that posts to a relay (or directly to an upstream) at
/// `<base_url>/api/chat`.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    base_url: String,
    http: reqwest::Client,
    transport_options: TransportOptions,
}

impl HttpChatClient {
    pub fn new(
        base_url: impl Into<String>,
        transport_options: TransportOptions,
    ) -> Result<Self, ClientError> {
        let http = build_http_client(&transport_options)?;
        Ok(Self {
            base_url: base_url.into(),
            http,
            transport_options,
        })
    }

    /// Full URL of the chat endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), CHAT_PATH)
    }

    /// Send the request and return the response whatever its status.
    pub async fn send(&self, request: &ChatRequest) -> Result<reqwest::Response, ClientError> {
        let url = self.endpoint();
        debug!(%url, messages = request.messages.len(), "sending chat request");

        let mut req = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json");
        req = add_extra_headers(req, &self.transport_options.extra_headers);

        Ok(req.json(request).send().await?)
    }
}

#[async_trait]
impl ChatTransport for HttpChatClient {
    async fn open(&self, request: &ChatRequest) -> Result<ByteStream, ClientError> {
        let response = self.send(request).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        Ok(Box::pin(
            response.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HttpChatClient::new("http://localhost:3000/", TransportOptions::default())
            .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/chat");

        let client =
            HttpChatClient::new("http://localhost:3000", TransportOptions::default()).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:3000/api/chat");
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.to_string(),
            "Request failed with status 503 Service Unavailable"
        );
        assert_eq!(ClientError::Busy.to_string(), "A response is already streaming");

        let err = ClientError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        assert_eq!(err.to_string(), "Stream error: connection reset");
    }
}
