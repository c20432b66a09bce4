//! Interactive terminal chat against a running relay.
//!
//! Run with:
//! ```bash
//! cargo run --bin chatrelay &
//! cargo run --example chat -- http://localhost:3000
//! ```
//!
//! Ctrl-C while a reply is streaming cancels that reply only.

use std::io::Write;

use chatrelay::client::{ClientError, HttpChatClient};
use chatrelay::model::Role;
use chatrelay::options::TransportOptions;
use chatrelay::session::ChatSession;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3000".to_string());

    let client = HttpChatClient::new(base_url, TransportOptions::default())?;
    let mut session = ChatSession::new(client);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("> ");
    std::io::stdout().flush()?;

    while let Some(input) = lines.next_line().await? {
        if input.trim().is_empty() {
            print!("> ");
            std::io::stdout().flush()?;
            continue;
        }

        // Print only what each update appended to the streaming message
        let mut printed = 0;
        let turn = session.send(&input, |transcript| {
            if let Some(message) = transcript.streaming_message() {
                print!("{}", &message.content[printed..]);
                printed = message.content.len();
                let _ = std::io::stdout().flush();
            }
        });

        // Ctrl-C abandons the reply; the session closes the turn itself
        let result = tokio::select! {
            result = turn => result,
            _ = tokio::signal::ctrl_c() => Err(ClientError::Cancelled),
        };
        println!();

        if let Err(e) = result {
            if let Some(notice) = session
                .transcript()
                .last()
                .filter(|m| m.role == Role::System)
            {
                println!("[{}] {}", notice.role, notice.content);
            }
            eprintln!("error: {}", e);
        }

        print!("> ");
        std::io::stdout().flush()?;
    }

    Ok(())
}
