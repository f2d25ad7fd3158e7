//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse},
};
use reqwest::Client;
use std::collections::HashMap;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, warn};

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for the rest of an exchange.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Lower-cased fragments that identify certificate and handshake failures in
/// the error chain of a failed request.
const SECURITY_MARKERS: &[&str] = &["certificate", "handshake", "tls", "ssl"];

/// Reqwest-based HTTP transport
///
/// Provides:
/// - rustls with a TLS 1.2 floor
/// - Connection pooling via reqwest
/// - Exactly one attempt per [`HttpClient::execute`] call; retries belong to
///   the engine
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a client with the default 10 s connect and read timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the TLS backend cannot be initialised. Use
    /// [`try_with_timeouts`](Self::try_with_timeouts) to handle that case.
    pub fn new() -> Self {
        Self::try_with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
            .expect("Failed to build HTTP client")
    }

    /// Fallible counterpart of [`new`](Self::new).
    pub fn try_new() -> Result<Self> {
        Self::try_with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a client with custom timeouts.
    pub fn try_with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .pool_max_idle_per_host(10)
            .user_agent(concat!("api-request-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap a preconfigured reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Map a reqwest failure onto the transport/security split.
    fn classify_error(error: &reqwest::Error) -> BridgeError {
        // The top-level message embeds the URL, so only the causes are inspected.
        if error.source().is_some_and(chain_mentions_security) {
            return BridgeError::Security(describe_chain(error));
        }

        if error.is_timeout() {
            BridgeError::Transport(format!("Request timed out: {}", describe_chain(error)))
        } else if error.is_connect() {
            BridgeError::Transport(format!("Connection failed: {}", describe_chain(error)))
        } else {
            BridgeError::Transport(describe_chain(error))
        }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn chain_mentions_security(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        let message = err.to_string().to_ascii_lowercase();
        if SECURITY_MARKERS.iter().any(|marker| message.contains(marker)) {
            return true;
        }
        current = err.source();
    }
    false
}

fn describe_chain(error: &(dyn StdError + 'static)) -> String {
    let mut description = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        description.push_str(": ");
        description.push_str(&err.to_string());
        current = err.source();
    }
    description
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = %request.method, url = %request.url, "Executing HTTP request");

        let response = self.build_request(request).send().await.map_err(|e| {
            let error = Self::classify_error(&e);
            warn!(error = %error, "HTTP request failed");
            error
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_error(&e))?;

        debug!(status, size = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
