//! Terminal result of one request.

use std::fmt;

/// The single result delivered per request execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success(T),
    /// Transport failure after the retry budget, a security fault, or an
    /// unreadable cache file.
    NetworkError(String),
    /// The server answered with a 4xx or 5xx status.
    HttpStatusError { code: u16, body: String },
    /// The body could not be decrypted or parsed.
    DecodeError(String),
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Short name of the variant, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::NetworkError(_) => "network_error",
            Outcome::HttpStatusError { .. } => "http_status_error",
            Outcome::DecodeError(_) => "decode_error",
        }
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::NetworkError(message) => Outcome::NetworkError(message),
            Outcome::HttpStatusError { code, body } => Outcome::HttpStatusError { code, body },
            Outcome::DecodeError(message) => Outcome::DecodeError(message),
        }
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(_) => f.write_str("success"),
            Outcome::NetworkError(message) => write!(f, "network error: {}", message),
            Outcome::HttpStatusError { code, .. } => write!(f, "HTTP status {}", code),
            Outcome::DecodeError(message) => write!(f, "decode error: {}", message),
        }
    }
}
