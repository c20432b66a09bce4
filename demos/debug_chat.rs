//! Send a fixed greeting through a running relay and dump the raw response.
//!
//! Run with:
//! ```bash
//! cargo run --bin chatrelay &
//! cargo run --example debug_chat -- http://localhost:3000
//! ```

use chatrelay::client::HttpChatClient;
use chatrelay::model::{ChatMessage, ChatRequest, Role};
use chatrelay::options::TransportOptions;
use futures::StreamExt;
use itertools::Itertools;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    let client = HttpChatClient::new(base_url, TransportOptions::default())?;
    let request = ChatRequest::from_history(&[ChatMessage::new(Role::User, "Hello")])
        .ok_or("empty request")?;

    println!("Sending request to {}...", client.endpoint());
    let response = client.send(&request).await?;

    println!("Response Status: {}", response.status());
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("<binary>")))
        .join(", ");
    println!("Response Headers: {{{}}}", headers);

    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        println!("CHUNK: {}", String::from_utf8_lossy(&chunk));
    }

    Ok(())
}
