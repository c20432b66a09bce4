//! # chatrelay - Streaming chat relay
//!
//! A small, pragmatic crate for putting a chat widget in front of a
//! language model service.
//!
//! ## Features
//! - Edge proxy that relays `POST /api/chat` to an upstream and streams the
//!   response body back as it arrives
//! - Incremental decoder for the line-delimited data stream protocol
//!   (`0:"text delta"`), tolerant of frames and UTF-8 sequences split across
//!   network reads
//! - Pure transcript reducer and a one-request-at-a-time chat session
//!
//! ## Architecture
//!
//! ```text
//! browser/session --POST /api/chat--> proxy --POST <upstream>/api/chat--> model service
//!        ^                              |
//!        +------ relayed byte stream ---+
//! ```
//!
//! ### Core Types
//!
//! - **`ChatSession`**: sends a message and folds the streamed reply into a `Transcript`
//! - **`Transcript`**: append-only message log driven by `ChatEvent`s
//! - **`FrameDecoder`** / **`text_deltas`**: bytes to text deltas
//! - **`proxy::router`**: the axum relay
//!
//! ## Example
//! ```no_run
//! use chatrelay::client::HttpChatClient;
//! use chatrelay::options::TransportOptions;
//! use chatrelay::session::ChatSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = HttpChatClient::new("http://localhost:3000", TransportOptions::default())?;
//!     let mut session = ChatSession::new(client);
//!
//!     session
//!         .send("What did you build with PyTorch?", |transcript| {
//!             if let Some(message) = transcript.streaming_message() {
//!                 println!("{}", message.content);
//!             }
//!         })
//!         .await?;
//!
//!     println!("{}", session.transcript());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod decoder;
pub mod http;
pub mod model;
pub mod options;
pub mod protocol;
pub mod proxy;
pub mod session;
pub mod transcript;

// Re-exports for convenience
pub use client::{ChatTransport, ClientError, HttpChatClient};
pub use decoder::{text_deltas, DataStreamResponseExt, FrameDecoder};
pub use model::{ChatMessage, ChatRequest, Role};
pub use protocol::Frame;
pub use session::ChatSession;
pub use transcript::{ChatEvent, Transcript};
