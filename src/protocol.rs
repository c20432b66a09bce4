//! Data stream wire protocol frames.
//!
//! The upstream writes one frame per line, `<kind>:<payload>`:
//! ```text
//! 0:"Hello "
//! 0:"world!"
//! d:{"finishReason":"stop"}
//! ```
//!
//! Only kind `0` (text delta, payload is a JSON string literal) is decoded;
//! other kinds are surfaced untouched so callers can ignore them.

use crate::client::ClientError;

/// Frame kind carrying a text delta.
pub const TEXT_DELTA_KIND: &str = "0";

/// One parsed line of the data stream protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Incremental assistant text, already JSON-unescaped.
    TextDelta(String),
    /// Any other frame kind, payload left raw.
    Other { kind: String, payload: String },
}

impl Frame {
    /// Convenience accessor for `TextDelta` contents.
    pub fn as_text_delta(&self) -> Option<&str> {
        match self {
            Frame::TextDelta(text) => Some(text),
            Frame::Other { .. } => None,
        }
    }
}

/// Parse a single protocol line.
///
/// Returns `Ok(None)` for blank lines and lines that are not frames at all,
/// and `Err` when a text delta payload is not a valid JSON string.
///
/// # Example
/// ```
/// use chatrelay::protocol::{parse_frame, Frame};
///
/// let frame = parse_frame(r#"0:"caf\u00e9""#).unwrap();
/// assert_eq!(frame, Some(Frame::TextDelta("café".to_string())));
///
/// assert_eq!(parse_frame("   ").unwrap(), None);
/// assert!(parse_frame("0:not-json").is_err());
/// ```
pub fn parse_frame(line: &str) -> Result<Option<Frame>, ClientError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.trim().is_empty() {
        return Ok(None);
    }

    let Some((kind, payload)) = line.split_once(':') else {
        return Ok(None);
    };
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Ok(None);
    }

    if kind == TEXT_DELTA_KIND {
        let text: String = serde_json::from_str(payload)?;
        return Ok(Some(Frame::TextDelta(text)));
    }

    Ok(Some(Frame::Other {
        kind: kind.to_string(),
        payload: payload.to_string(),
    }))
}
