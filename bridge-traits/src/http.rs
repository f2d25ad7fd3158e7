//! HTTP Transport Abstraction
//!
//! One call to [`HttpClient::execute`] is one network attempt. Retry, caching
//! and status-class handling live in the engine; implementations only have to
//! dispatch the request, read the full body, and classify failures as
//! [`BridgeError::Transport`] or [`BridgeError::Security`].
//!
//! [`BridgeError::Transport`]: crate::error::BridgeError::Transport
//! [`BridgeError::Security`]: crate::error::BridgeError::Security

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether a request body may be attached to this method.
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request, ready for a single attempt.
///
/// Headers keep insertion order and may repeat.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// Append a header. Existing headers with the same name are kept.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// First value for `name`, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP response with the body fully read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Status class: 2 for 2xx, 4 for 4xx, and so on.
    pub fn status_class(&self) -> u16 {
        self.status / 100
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        self.status_class() == 2
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status_class() == 4
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_class() == 5
    }
}

/// Transport capability used by the request engine.
///
/// Implementations must not retry internally; the engine owns the retry
/// budget and counts every call as one attempt.
///
/// # Errors
///
/// - [`BridgeError::Security`](crate::error::BridgeError::Security) for
///   certificate or handshake failures
/// - [`BridgeError::Transport`](crate::error::BridgeError::Transport) for
///   timeouts, refused connections and body read failures
///
/// A response with any status code, including 4xx and 5xx, is `Ok`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest, HttpMethod};
///
/// async fn fetch(client: &dyn HttpClient) -> bridge_traits::error::Result<u16> {
///     let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com/items");
///     Ok(client.execute(request).await?.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a single attempt of an HTTP request.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
