//! Incremental decoding of a relayed data stream into text deltas.
//!
//! Network reads split the body at arbitrary byte offsets, including inside a
//! multi-byte UTF-8 sequence or in the middle of a frame. Decoding happens in
//! three layers, each carrying its unfinished tail to the next read:
//!
//! 1. [`Utf8Decoder`] turns bytes into text, holding back a truncated sequence.
//! 2. [`LineBuffer`] splits text on `\n`, holding back the unterminated line.
//! 3. [`parse_frame`] turns each complete line into a [`Frame`].
//!
//! [`FrameDecoder`] ties them together and [`text_deltas`] exposes the result
//! as a lazy stream.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::protocol::{parse_frame, Frame};

/// Streaming UTF-8 decoder.
///
/// A sequence truncated at the end of a chunk is kept until the next chunk
/// completes it; it never turns into a replacement character. Bytes that are
/// invalid regardless of what follows become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, prefixed by whatever was held back last time.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut input = bytes.as_slice();
        let mut out = String::with_capacity(input.len());

        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // Incomplete sequence at the end of input
                            self.pending = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush at end of stream. A sequence that never completed becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            char::REPLACEMENT_CHARACTER.to_string()
        }
    }
}

/// Newline splitter that keeps the unterminated tail between pushes.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return every line it completed, without the `\n`.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        // Only the new text can hold a newline; the held-back tail has none.
        let start = self.buffer.len();
        self.buffer.push_str(text);

        let Some(last) = text.rfind('\n').map(|i| start + i) else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        complete[..last].split('\n').map(str::to_string).collect()
    }

    /// Take the unterminated tail, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// Text currently held back.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}

/// Per-response decoder state: bytes in, text deltas out.
///
/// Instantiate one per response; it is discarded when the stream ends.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Decoder,
    lines: LineBuffer,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return the text deltas it completed.
    pub fn decode(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.utf8.decode(chunk);
        let lines = self.lines.push(&text);
        deltas_from_lines(lines)
    }

    /// End of stream: run the held-back tail through the same line parsing, so
    /// a final frame without a trailing newline is still delivered.
    pub fn finish(&mut self) -> Vec<String> {
        let flushed = self.utf8.finish();
        let mut lines = self.lines.push(&flushed);
        lines.extend(self.lines.finish());
        deltas_from_lines(lines)
    }
}

fn deltas_from_lines(lines: Vec<String>) -> Vec<String> {
    let mut deltas = Vec::new();

    for line in lines {
        match parse_frame(&line) {
            Ok(Some(Frame::TextDelta(text))) => deltas.push(text),
            Ok(Some(Frame::Other { kind, .. })) => {
                debug!(kind = %kind, "ignoring frame");
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Error parsing chunk: {} ({})", line, e);
            }
        }
    }

    deltas
}

/// Turn a byte stream into a lazy stream of text deltas.
///
/// Deltas decoded from one chunk are all yielded before the next chunk is
/// read. A transport error is yielded once and ends the stream.
///
/// # Example
/// ```
/// use bytes::Bytes;
/// use chatrelay::client::ClientError;
/// use chatrelay::decoder::text_deltas;
/// use futures::{stream, StreamExt};
///
/// # tokio_test_block_on(async {
/// let chunks = vec![
///     Ok::<_, ClientError>(Bytes::from_static(b"0:\"Hel")),
///     Ok(Bytes::from_static(b"lo\"\n")),
/// ];
/// let deltas: Vec<_> = text_deltas(stream::iter(chunks)).collect().await;
/// assert_eq!(deltas.into_iter().map(Result::unwrap).collect::<Vec<_>>(), ["Hello"]);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
pub fn text_deltas<S, E>(byte_stream: S) -> impl Stream<Item = Result<String, ClientError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Into<ClientError> + Send,
{
    stream::unfold(
        (
            Box::pin(byte_stream),
            FrameDecoder::new(),
            VecDeque::new(),
            false,
        ),
        |(mut byte_stream, mut decoder, mut ready, mut stream_ended)| async move {
            loop {
                if let Some(delta) = ready.pop_front() {
                    return Some((Ok(delta), (byte_stream, decoder, ready, stream_ended)));
                }

                if stream_ended {
                    return None;
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        ready.extend(decoder.decode(&chunk));
                    }
                    Some(Err(e)) => {
                        // Terminal: the partial tail is dropped with the decoder
                        stream_ended = true;
                        return Some((Err(e.into()), (byte_stream, decoder, ready, stream_ended)));
                    }
                    None => {
                        stream_ended = true;
                        ready.extend(decoder.finish());
                    }
                }
            }
        },
    )
}

/// Extension trait for `reqwest::Response` to decode a data stream body.
///
/// # Example
/// ```ignore
/// use chatrelay::decoder::DataStreamResponseExt;
///
/// let response = client.post(url).json(&request).send().await?;
/// let mut deltas = response.text_deltas();
/// while let Some(delta) = deltas.next().await {
///     print!("{}", delta?);
/// }
/// ```
pub trait DataStreamResponseExt {
    /// Convert the response body into a stream of text deltas.
    fn text_deltas(self) -> impl Stream<Item = Result<String, ClientError>> + Send;
}

impl DataStreamResponseExt for reqwest::Response {
    fn text_deltas(self) -> impl Stream<Item = Result<String, ClientError>> + Send {
        text_deltas(self.bytes_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(body: &[u8], size: usize) -> Vec<Result<Bytes, ClientError>> {
        body.chunks(size)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect()
    }

    async fn collect_text(chunks: Vec<Result<Bytes, ClientError>>) -> String {
        text_deltas(stream::iter(chunks))
            .map(|delta| delta.unwrap())
            .collect::<Vec<_>>()
            .await
            .concat()
    }

    #[test]
    fn test_utf8_decoder_carries_split_sequence() {
        let bytes = "é".as_bytes();
        let mut decoder = Utf8Decoder::new();

        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.decode(&bytes[1..]), "é");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_utf8_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_utf8_decoder_flushes_truncated_tail() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&"✓".as_bytes()[..2]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_line_buffer_holds_back_partial_line() {
        let mut lines = LineBuffer::new();

        assert!(lines.push("0:\"a").is_empty());
        assert_eq!(lines.push("\"\n0:\"b\"\n0:"), ["0:\"a\"", "0:\"b\""]);
        assert_eq!(lines.pending(), "0:");
        assert_eq!(lines.finish().as_deref(), Some("0:"));
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_buffer_keeps_blank_lines() {
        let mut lines = LineBuffer::new();
        assert_eq!(lines.push("\n\nx\n"), ["", "", "x"]);
    }

    #[test]
    fn test_line_buffer_joins_long_line_across_pushes() {
        let mut lines = LineBuffer::new();
        assert_eq!(lines.push("a\nb"), ["a"]);

        for _ in 0..1000 {
            assert!(lines.push("c").is_empty());
        }
        assert_eq!(lines.pending().len(), 1001);

        let complete = lines.push("d\ne");
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0], format!("b{}d", "c".repeat(1000)));
        assert_eq!(lines.pending(), "e");
    }

    #[test]
    fn test_frame_decoder_skips_malformed_frame() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.decode(b"0:\"Hello \"\n0:not-json\n0:\"world!\"\n");
        assert_eq!(deltas, ["Hello ", "world!"]);
    }

    #[test]
    fn test_frame_decoder_ignores_other_kinds() {
        let mut decoder = FrameDecoder::new();
        let deltas = decoder.decode(
            b"f:{\"messageId\":\"m1\"}\n0:\"hi\"\n2:[{\"x\":1}]\ne:{\"finishReason\":\"stop\"}\nd:{\"finishReason\":\"stop\"}\n",
        );
        assert_eq!(deltas, ["hi"]);
    }

    #[test]
    fn test_frame_decoder_flushes_unterminated_final_frame() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.decode(b"0:\"Hello \"\n0:\"world!\""), ["Hello "]);
        assert_eq!(decoder.finish(), ["world!"]);
    }

    #[tokio::test]
    async fn test_chunking_does_not_change_content() {
        let body = "0:\"Hello \"\n0:\"wörld! ✓ \\u00e9\"\n\n0:\"🦀\"\n".as_bytes();

        for size in 1..=body.len() {
            assert_eq!(
                collect_text(chunked(body, size)).await,
                "Hello wörld! ✓ é🦀",
                "chunk size {size}"
            );
        }
    }

    #[tokio::test]
    async fn test_hello_world() {
        let body = b"0:\"Hello \"\n0:\"world!\"\n";
        assert_eq!(collect_text(chunked(body, 5)).await, "Hello world!");
    }

    #[tokio::test]
    async fn test_empty_body_yields_nothing() {
        assert_eq!(collect_text(Vec::new()).await, "");
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks = vec![
            Ok(Bytes::from_static(b"0:\"a\"\n0:\"b")),
            Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )),
            Ok(Bytes::from_static(b"\"\n")),
        ];

        let items: Vec<_> = text_deltas(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "a");
        assert!(matches!(items[1], Err(ClientError::Io(_))));
    }
}
