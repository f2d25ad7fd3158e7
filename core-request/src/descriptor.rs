//! Immutable description of one HTTP call.

use crate::body::{is_valid_part_content_type, MultipartForm, MultipartPart, RequestBody};
use crate::cipher::{DecryptionKey, ResponseCipher};
use crate::error::{RequestError, Result};
use bridge_traits::HttpMethod;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// One query string parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    /// Percent-encoded as `key=value` when serialized.
    Pair { key: String, value: String },
    /// Pre-encoded text appended verbatim.
    Raw(String),
}

impl QueryParam {
    fn serialize(&self) -> String {
        match self {
            QueryParam::Pair { key, value } => format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            ),
            QueryParam::Raw(raw) => raw.clone(),
        }
    }
}

/// Everything the engine needs to perform and cache one request.
///
/// Built with [`RequestDescriptor::builder`] (or the per-method shortcuts)
/// and immutable afterwards. Cloning is cheap enough to reuse a descriptor
/// for another task.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: HttpMethod,
    base_url: String,
    query: Vec<QueryParam>,
    body: Option<RequestBody>,
    headers: Vec<(String, String)>,
    cipher: Option<Arc<dyn ResponseCipher>>,
    cache_ttl: Option<Duration>,
    retry_limit: Option<u32>,
    socket_timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn builder(method: HttpMethod, url: impl Into<String>) -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::new(method, url.into())
    }

    pub fn get(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Post, url)
    }

    pub fn put(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> RequestDescriptorBuilder {
        Self::builder(HttpMethod::Delete, url)
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// URL without its query string.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn query_params(&self) -> &[QueryParam] {
        &self.query
    }

    /// Serialized query string including the leading `?`, or empty.
    pub fn query_string(&self) -> String {
        let params: Vec<String> = self
            .query
            .iter()
            .map(QueryParam::serialize)
            .filter(|param| !param.is_empty())
            .collect();

        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }

    /// Base URL followed by the query string.
    pub fn full_url(&self) -> String {
        format!("{}{}", self.base_url, self.query_string())
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of a header, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Cipher applied to the response body before decoding.
    pub fn cipher(&self) -> Option<&dyn ResponseCipher> {
        self.cipher.as_deref()
    }

    /// Cache lifetime; `None` disables caching for this request.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl
    }

    /// Attempt budget; `None` uses the engine default.
    pub fn retry_limit(&self) -> Option<u32> {
        self.retry_limit
    }

    /// Per-attempt timeout; `None` uses the engine default.
    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    pub fn is_cacheable(&self) -> bool {
        self.cache_ttl.is_some()
    }
}

/// Builder for [`RequestDescriptor`].
///
/// Setters never fail; the first invalid call is remembered and reported by
/// [`build`](Self::build).
#[derive(Debug)]
pub struct RequestDescriptorBuilder {
    method: HttpMethod,
    url: String,
    query: Vec<QueryParam>,
    body: Option<RequestBody>,
    headers: Vec<(String, String)>,
    cipher: Option<Arc<dyn ResponseCipher>>,
    cache_ttl: Option<Duration>,
    retry_limit: Option<u32>,
    socket_timeout: Option<Duration>,
    error: Option<RequestError>,
}

impl RequestDescriptorBuilder {
    fn new(method: HttpMethod, url: String) -> Self {
        let (base, query) = match url.split_once('?') {
            Some((base, query)) => (base.to_string(), Some(query.to_string())),
            None => (url, None),
        };

        let query = query
            .filter(|q| !q.is_empty())
            .map(|q| vec![QueryParam::Raw(q)])
            .unwrap_or_default();

        Self {
            method,
            url: base,
            query,
            body: None,
            headers: Vec::new(),
            cipher: None,
            cache_ttl: None,
            retry_limit: None,
            socket_timeout: None,
            error: None,
        }
    }

    fn fail(&mut self, error: RequestError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn set_body(&mut self, body: RequestBody) {
        if !self.method.allows_body() {
            self.fail(RequestError::BodyNotAllowed {
                method: self.method,
            });
            return;
        }

        if let Some(existing) = self.body.as_ref().map(RequestBody::kind) {
            self.fail(RequestError::DuplicateBody {
                existing,
                attempted: body.kind(),
            });
            return;
        }

        self.body = Some(body);
    }

    /// Append a `key=value` query parameter (both percent-encoded).
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push(QueryParam::Pair {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Append a pre-encoded query fragment verbatim.
    pub fn raw_query(mut self, parameter: impl Into<String>) -> Self {
        let parameter = parameter.into();
        let trimmed = parameter.trim_matches('&');
        if !trimmed.is_empty() {
            self.query.push(QueryParam::Raw(trimmed.to_string()));
        }
        self
    }

    /// Append a header. Repeated names are kept in order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();

        if name.is_empty() || !name.bytes().all(is_token_byte) {
            self.fail(RequestError::InvalidDescriptor(format!(
                "Invalid header name '{}'",
                name
            )));
            return self;
        }
        if value.contains(['\r', '\n']) {
            self.fail(RequestError::InvalidDescriptor(format!(
                "Header '{}' contains a line break",
                name
            )));
            return self;
        }

        self.headers.push((name, value));
        self
    }

    /// Add a URL-encoded form field. Repeated calls extend the same form.
    pub fn form_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (key.into(), value.into());
        match &mut self.body {
            Some(RequestBody::Form(fields)) => fields.push(field),
            _ => self.set_body(RequestBody::Form(vec![field])),
        }
        self
    }

    /// Send an empty URL-encoded form.
    pub fn empty_form(mut self) -> Self {
        if !matches!(self.body, Some(RequestBody::Form(_))) {
            self.set_body(RequestBody::Form(Vec::new()));
        }
        self
    }

    /// Add a plain multipart field.
    pub fn multipart_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_part(MultipartPart::Field {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a multipart file part.
    pub fn multipart_file(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let name = name.into();
        let content_type = content_type.into();

        if !is_valid_part_content_type(&content_type) {
            self.fail(RequestError::InvalidDescriptor(format!(
                "Multipart part '{}' has an invalid content type",
                name
            )));
            return self;
        }

        self.push_part(MultipartPart::File {
            name,
            filename: filename.into(),
            content_type,
            data: data.into(),
        });
        self
    }

    fn push_part(&mut self, part: MultipartPart) {
        match &mut self.body {
            Some(RequestBody::Multipart(form)) => form.push(part),
            _ => {
                let mut form = MultipartForm::new();
                form.push(part);
                self.set_body(RequestBody::Multipart(form));
            }
        }
    }

    pub fn bytes_body(mut self, data: impl Into<Bytes>) -> Self {
        self.set_body(RequestBody::Bytes(data.into()));
        self
    }

    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.set_body(RequestBody::Text(text.into()));
        self
    }

    pub fn json_body(mut self, value: serde_json::Value) -> Self {
        self.set_body(RequestBody::Json(value));
        self
    }

    /// Send the contents of a local file, read when the request is sent.
    pub fn file_body(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_body(RequestBody::File(path.into()));
        self
    }

    /// Decrypt the response with an AES-256-GCM key.
    pub fn decryption_key(self, key: DecryptionKey) -> Self {
        self.cipher(key)
    }

    /// Decrypt the response with any cipher before decoding.
    pub fn cipher(mut self, cipher: impl ResponseCipher + 'static) -> Self {
        self.cipher = Some(Arc::new(cipher));
        self
    }

    /// Enable caching with the given lifetime. Zero is rejected.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        if ttl.is_zero() {
            self.fail(RequestError::InvalidDescriptor(
                "Cache TTL must be greater than zero".to_string(),
            ));
        } else {
            self.cache_ttl = Some(ttl);
        }
        self
    }

    /// Number of network attempts. Must be at least 1.
    pub fn retry_limit(mut self, limit: u32) -> Self {
        if limit == 0 {
            self.fail(RequestError::InvalidDescriptor(
                "Retry limit must allow at least one attempt".to_string(),
            ));
        } else {
            self.retry_limit = Some(limit);
        }
        self
    }

    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        if timeout.is_zero() {
            self.fail(RequestError::InvalidDescriptor(
                "Socket timeout must be greater than zero".to_string(),
            ));
        } else {
            self.socket_timeout = Some(timeout);
        }
        self
    }

    pub fn build(self) -> Result<RequestDescriptor> {
        if let Some(error) = self.error {
            return Err(error);
        }

        validate_url(&self.url)?;

        Ok(RequestDescriptor {
            method: self.method,
            base_url: self.url,
            query: self.query,
            body: self.body,
            headers: self.headers,
            cipher: self.cipher,
            cache_ttl: self.cache_ttl,
            retry_limit: self.retry_limit,
            socket_timeout: self.socket_timeout,
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| RequestError::InvalidUrl(format!("'{}' is not an http(s) URL", url)))?;

    let host = rest.split(['/', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(RequestError::InvalidUrl(format!(
            "'{}' has no host or contains whitespace",
            url
        )));
    }

    Ok(())
}

fn is_token_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&byte)
}
