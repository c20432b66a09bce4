//! Chat session: drives one request/response turn at a time.

use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::client::{ChatTransport, ClientError};
use crate::decoder::text_deltas;
use crate::model::{new_message_id, ChatRequest};
use crate::transcript::{ChatEvent, Transcript};

/// A single chat conversation bound to a transport.
///
/// Only one request may be in flight. `send` takes `&mut self`, and the
/// transcript's loading flag rejects a second `begin` until the turn ends.
///
/// # Example
/// ```ignore
/// let client = HttpChatClient::new("http://localhost:3000", TransportOptions::default())?;
/// let mut session = ChatSession::new(client);
///
/// session
///     .send("Tell me about your PyTorch work", |transcript| {
///         render(transcript);
///     })
///     .await?;
/// ```
pub struct ChatSession<T: ChatTransport> {
    transport: T,
    transcript: Transcript,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            transcript: Transcript::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_loading(&self) -> bool {
        self.transcript.is_loading()
    }

    /// Record the user's message and build the request for this turn.
    ///
    /// Fails with [`ClientError::Busy`] while a response is streaming and with
    /// [`ClientError::EmptyInput`] for blank input.
    pub fn begin(&mut self, input: &str) -> Result<ChatRequest, ClientError> {
        if self.transcript.is_loading() {
            return Err(ClientError::Busy);
        }
        if input.trim().is_empty() {
            return Err(ClientError::EmptyInput);
        }

        self.transcript.apply(ChatEvent::UserSent {
            id: new_message_id(),
            content: input.to_string(),
        });

        self.transcript.history().ok_or(ClientError::EmptyInput)
    }

    /// Send `input` and stream the reply into the transcript.
    ///
    /// `on_update` runs after every change to the transcript. On failure the
    /// transcript ends with a system error notice and the error is returned.
    /// Dropping the future mid-turn (a timeout, `select!`) ends the turn the
    /// same way with [`ClientError::Cancelled`], so the session stays usable.
    pub async fn send<F>(&mut self, input: &str, mut on_update: F) -> Result<(), ClientError>
    where
        F: FnMut(&Transcript),
    {
        let request = self.begin(input)?;
        let mut turn = Turn {
            transcript: &mut self.transcript,
        };
        on_update(&*turn.transcript);

        let body = match self.transport.open(&request).await {
            Ok(body) => body,
            Err(e) => return Err(turn.fail(e, &mut on_update)),
        };

        turn.apply(
            ChatEvent::AssistantStarted {
                id: new_message_id(),
            },
            &mut on_update,
        );

        let mut deltas = std::pin::pin!(text_deltas(body));
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(delta) => {
                    turn.apply(ChatEvent::AssistantDeltaReceived { delta }, &mut on_update)
                }
                Err(e) => return Err(turn.fail(e, &mut on_update)),
            }
        }

        turn.apply(ChatEvent::AssistantFinalized, &mut on_update);
        debug!(
            messages = turn.transcript.messages().len(),
            "assistant message finalized"
        );

        Ok(())
    }
}

/// The transcript for the duration of one turn.
///
/// Dropped while still loading, it closes the turn with `ErrorOccurred`.
struct Turn<'a> {
    transcript: &'a mut Transcript,
}

impl Turn<'_> {
    fn apply<F>(&mut self, event: ChatEvent, on_update: &mut F)
    where
        F: FnMut(&Transcript),
    {
        self.transcript.apply(event);
        on_update(&*self.transcript);
    }

    fn fail<F>(&mut self, e: ClientError, on_update: &mut F) -> ClientError
    where
        F: FnMut(&Transcript),
    {
        error!("Chat error: {}", e);
        self.apply(
            ChatEvent::ErrorOccurred {
                message: e.to_string(),
            },
            on_update,
        );
        e
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        if self.transcript.is_loading() {
            warn!("Chat turn dropped before completion");
            self.transcript.apply(ChatEvent::ErrorOccurred {
                message: ClientError::Cancelled.to_string(),
            });
        }
    }
}
