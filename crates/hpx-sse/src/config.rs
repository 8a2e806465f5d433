//! SSE connection configuration.

use std::time::Duration;

use crate::error::{SseError, SseResult};

/// Configuration for an [`EventSource`](crate::EventSource).
///
/// Built with chainable setters on top of sensible defaults:
///
/// ```rust
/// use std::time::Duration;
///
/// use hpx_sse::SseConfig;
///
/// let config = SseConfig::new("https://api.example.com/v1/stream")
///     .method(http::Method::GET)
///     .retry_on_disconnect(true)
///     .reconnect_interval(Duration::from_secs(5));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct SseConfig {
    /// SSE endpoint URL.
    pub url: String,
    /// HTTP method. Defaults to `POST`; streams that only need a subscription
    /// URL usually want `GET`.
    pub method: http::Method,
    /// Additional HTTP headers to include with every SSE request.
    pub headers: http::HeaderMap,
    /// Optional request body, resent on every reconnection.
    pub body: Option<Vec<u8>>,
    /// `Last-Event-ID` to send on the first connection.
    pub last_event_id: Option<String>,
    /// Reconnect after a transport error instead of closing.
    pub retry_on_disconnect: bool,
    /// Delay before a reconnection attempt.
    pub reconnect_interval: Duration,
    /// Bound on opening the stream and on the idle gap between two chunks.
    pub timeout_interval: Duration,
    /// Let `retry:` fields sent by the server override `reconnect_interval`.
    pub honor_retry_field: bool,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: http::Method::POST,
            headers: http::HeaderMap::new(),
            body: None,
            last_event_id: None,
            retry_on_disconnect: false,
            reconnect_interval: Duration::from_secs(3),
            timeout_interval: Duration::from_secs(60),
            honor_retry_field: true,
        }
    }
}

impl SseConfig {
    /// Create a new SSE configuration with the given URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: http::Method) -> Self {
        self.method = method;
        self
    }

    /// Set additional HTTP headers.
    #[must_use]
    pub fn headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Resume from the given event ID on the first connection.
    #[must_use]
    pub fn last_event_id(mut self, id: impl Into<String>) -> Self {
        self.last_event_id = Some(id.into());
        self
    }

    /// Set whether transport errors trigger a reconnection.
    #[must_use]
    pub fn retry_on_disconnect(mut self, retry: bool) -> Self {
        self.retry_on_disconnect = retry;
        self
    }

    /// Set the reconnection delay.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Set the request/idle timeout.
    #[must_use]
    pub fn timeout_interval(mut self, timeout: Duration) -> Self {
        self.timeout_interval = timeout;
        self
    }

    /// Set whether server `retry:` fields override the reconnection delay.
    #[must_use]
    pub fn honor_retry_field(mut self, honor: bool) -> Self {
        self.honor_retry_field = honor;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SseError::Config`] if any field has an invalid value.
    pub fn validate(&self) -> SseResult<()> {
        if self.url.is_empty() {
            return Err(SseError::config("URL cannot be empty"));
        }
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| SseError::config(format!("Invalid URL {:?}: {e}", self.url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SseError::config(format!(
                "Unsupported URL scheme {:?}",
                parsed.scheme()
            )));
        }
        if self.timeout_interval.is_zero() {
            return Err(SseError::config("Timeout interval must be > 0"));
        }
        if let Some(id) = &self.last_event_id
            && http::HeaderValue::from_str(id).is_err()
        {
            return Err(SseError::config(
                "Last event ID is not a valid header value",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_message(result: SseResult<()>) -> String {
        match result.expect_err("should fail") {
            SseError::Config { message } => message,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_config() {
        let config = SseConfig::default();
        assert!(config.url.is_empty());
        assert_eq!(config.method, http::Method::POST);
        assert!(config.headers.is_empty());
        assert!(config.body.is_none());
        assert!(config.last_event_id.is_none());
        assert!(!config.retry_on_disconnect);
        assert_eq!(config.reconnect_interval, Duration::from_secs(3));
        assert_eq!(config.timeout_interval, Duration::from_secs(60));
        assert!(config.honor_retry_field);
    }

    #[test]
    fn test_new_sets_url() {
        let config = SseConfig::new("https://api.example.com/stream");
        assert_eq!(config.url, "https://api.example.com/stream");
        assert_eq!(config.method, http::Method::POST);
    }

    #[test]
    fn test_all_builder_methods() {
        let mut headers = http::HeaderMap::new();
        headers.insert("X-Api-Key", "test-key".parse().expect("valid header value"));

        let config = SseConfig::new("https://api.example.com/v1/stream")
            .method(http::Method::GET)
            .headers(headers)
            .body(b"{\"channels\":[\"chat\"]}".to_vec())
            .last_event_id("evt-41")
            .retry_on_disconnect(true)
            .reconnect_interval(Duration::from_millis(500))
            .timeout_interval(Duration::from_secs(15))
            .honor_retry_field(false);

        assert_eq!(config.method, http::Method::GET);
        assert_eq!(
            config
                .headers
                .get("X-Api-Key")
                .map(|v| v.to_str().expect("valid str")),
            Some("test-key")
        );
        assert_eq!(
            config.body.as_deref(),
            Some(b"{\"channels\":[\"chat\"]}".as_slice())
        );
        assert_eq!(config.last_event_id.as_deref(), Some("evt-41"));
        assert!(config.retry_on_disconnect);
        assert_eq!(config.reconnect_interval, Duration::from_millis(500));
        assert_eq!(config.timeout_interval, Duration::from_secs(15));
        assert!(!config.honor_retry_field);
    }

    #[test]
    fn test_validation_empty_url() {
        let config = SseConfig::default();
        assert_eq!(config_message(config.validate()), "URL cannot be empty");
    }

    #[test]
    fn test_validation_malformed_url() {
        let config = SseConfig::new("not a url");
        assert!(config_message(config.validate()).starts_with("Invalid URL"));
    }

    #[test]
    fn test_validation_unsupported_scheme() {
        let config = SseConfig::new("ftp://example.com/stream");
        assert_eq!(
            config_message(config.validate()),
            "Unsupported URL scheme \"ftp\""
        );
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = SseConfig::new("https://example.com").timeout_interval(Duration::ZERO);
        assert_eq!(
            config_message(config.validate()),
            "Timeout interval must be > 0"
        );
    }

    #[test]
    fn test_validation_bad_last_event_id() {
        let config = SseConfig::new("https://example.com").last_event_id("a\nb");
        assert_eq!(
            config_message(config.validate()),
            "Last event ID is not a valid header value"
        );
    }

    #[test]
    fn test_validation_zero_reconnect_interval_is_allowed() {
        let config = SseConfig::new("http://127.0.0.1:8080/events")
            .reconnect_interval(Duration::ZERO);
        assert!(config.validate().is_ok());
    }
}
