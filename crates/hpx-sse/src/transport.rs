//! HTTP transport boundary.
//!
//! An [`SseTransport`] turns one [`SseRequest`] into an ordered stream of body
//! chunks. The end of the stream means the server closed cleanly; an `Err` item
//! means the connection failed. [`HttpTransport`] is the reqwest-backed
//! implementation used by default.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream::BoxStream};
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use tracing::debug;

use crate::{
    config::SseConfig,
    error::{SseError, SseResult},
};

/// Body chunks of one SSE response.
pub type ByteStream = BoxStream<'static, SseResult<Bytes>>;

const EVENT_STREAM: &str = "text/event-stream";
const LAST_EVENT_ID: &str = "last-event-id";

/// A fully prepared SSE request.
#[derive(Clone, Debug)]
pub struct SseRequest {
    /// Endpoint URL.
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Request headers, including the SSE negotiation headers.
    pub headers: HeaderMap,
    /// Optional request body.
    pub body: Option<Vec<u8>>,
}

impl SseRequest {
    /// Build the request for one connection attempt.
    ///
    /// Configured headers are sent as-is, then `Accept`, `Cache-Control` and
    /// (when known and non-empty) `Last-Event-ID` are set.
    pub fn from_config(config: &SseConfig, last_event_id: Option<&str>) -> Self {
        let mut headers = config.headers.clone();
        headers.insert(header::ACCEPT, HeaderValue::from_static(EVENT_STREAM));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if let Some(id) = last_event_id.filter(|id| !id.is_empty()) {
            match HeaderValue::from_str(id) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(LAST_EVENT_ID), value);
                }
                Err(_) => debug!(id, "Last event ID is not a valid header value, not sent"),
            }
        }

        Self {
            url: config.url.clone(),
            method: config.method.clone(),
            headers,
            body: config.body.clone(),
        }
    }

    /// The `Last-Event-ID` this request will send.
    pub fn last_event_id(&self) -> Option<&str> {
        self.headers
            .get(LAST_EVENT_ID)
            .and_then(|value| value.to_str().ok())
    }
}

/// Opens SSE response bodies.
#[async_trait]
pub trait SseTransport: Send + Sync + 'static {
    /// Send `request` and return the response body once the server has
    /// accepted it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not an event
    /// stream.
    async fn open(&self, request: SseRequest) -> SseResult<ByteStream>;
}

/// [`SseTransport`] over a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> SseResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SseError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an existing client (proxies, TLS roots, connection pool, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SseTransport for HttpTransport {
    async fn open(&self, request: SseRequest) -> SseResult<ByteStream> {
        let SseRequest {
            url,
            method,
            headers,
            body,
        } = request;

        let mut req = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SseError::invalid_status(status));
        }

        if let Some(ct) = resp.headers().get(header::CONTENT_TYPE) {
            let ct_str = ct.to_str().unwrap_or("");
            if !ct_str.contains(EVENT_STREAM) {
                return Err(SseError::invalid_content_type(ct_str));
            }
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(SseError::Http))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_sse_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        let config = SseConfig::new("https://example.com/events")
            .headers(headers)
            .body(b"{}".to_vec());

        let request = SseRequest::from_config(&config, Some("42"));

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://example.com/events");
        assert_eq!(request.body.as_deref(), Some(b"{}".as_slice()));
        assert_eq!(request.headers[header::ACCEPT], "text/event-stream");
        assert_eq!(request.headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(request.headers["authorization"], "Bearer t");
        assert_eq!(request.last_event_id(), Some("42"));
    }

    #[test]
    fn sse_headers_override_configured_ones() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let config = SseConfig::new("https://example.com/events").headers(headers);

        let request = SseRequest::from_config(&config, None);
        assert_eq!(request.headers[header::ACCEPT], "text/event-stream");
    }

    #[test]
    fn last_event_id_omitted_when_unknown_or_empty() {
        let config = SseConfig::new("https://example.com/events");
        assert!(SseRequest::from_config(&config, None).last_event_id().is_none());
        assert!(SseRequest::from_config(&config, Some("")).last_event_id().is_none());
        assert!(
            SseRequest::from_config(&config, Some("bad\nid"))
                .last_event_id()
                .is_none()
        );
    }
}
