//! Transport options shared by the relay's upstream client and the chat client.

use std::collections::HashMap;
use std::time::Duration;

/// HTTP transport configuration.
///
/// # Example
/// ```rust
/// use chatrelay::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new()
///     .with_timeout(Duration::from_secs(30))
///     .with_header("x-client".to_string(), "portfolio".to_string());
/// assert_eq!(options.timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Whole-request timeout. `None` means no timeout is enforced.
    pub timeout: Option<Duration>,

    /// HTTP proxy URL for outbound requests
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enforce_no_timeout() {
        let options = TransportOptions::default();
        assert!(options.timeout.is_none());
        assert!(options.proxy.is_none());
        assert!(options.extra_headers.is_none());
    }

    #[test]
    fn test_with_header_accumulates() {
        let options = TransportOptions::new()
            .with_header("a".to_string(), "1".to_string())
            .with_header("b".to_string(), "2".to_string());
        let headers = options.extra_headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["b"], "2");
    }
}
