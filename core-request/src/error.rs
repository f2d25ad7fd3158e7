//! # Request Error Types
//!
//! Construction-time and decode-time failures. Network and HTTP failures are
//! not errors in this sense: they are delivered as [`Outcome`](crate::Outcome)
//! variants.

use bridge_traits::{BridgeError, HttpMethod};
use thiserror::Error;

/// Errors raised while building or preparing a request.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The URL is not an absolute `http`/`https` URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A second body representation was set on the same descriptor.
    #[error("Request already has a {existing} body; cannot also set a {attempted} body")]
    DuplicateBody {
        existing: &'static str,
        attempted: &'static str,
    },

    /// The method does not accept a body.
    #[error("{method} requests cannot carry a body")]
    BodyNotAllowed { method: HttpMethod },

    /// A descriptor field has an invalid value.
    #[error("Invalid request descriptor: {0}")]
    InvalidDescriptor(String),

    /// The cache directory or a cache file could not be accessed.
    #[error("Cache error: {0}")]
    Cache(#[source] BridgeError),

    /// Engine configuration failed.
    #[error(transparent)]
    Runtime(#[from] core_runtime::Error),
}

pub type Result<T> = std::result::Result<T, RequestError>;

/// Errors raised while turning a response body into a domain value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Decryption failed (wrong key, truncated or tampered payload).
    #[error("Decryption failed: {0}")]
    Cipher(String),

    /// The plaintext could not be parsed.
    #[error("Parse failed: {0}")]
    Parse(String),

    /// The decoder panicked.
    #[error("Decoder panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RequestError::DuplicateBody {
            existing: "form",
            attempted: "JSON",
        };
        assert_eq!(
            err.to_string(),
            "Request already has a form body; cannot also set a JSON body"
        );

        let err = RequestError::BodyNotAllowed {
            method: HttpMethod::Get,
        };
        assert_eq!(err.to_string(), "GET requests cannot carry a body");

        assert_eq!(
            DecodeError::Cipher("bad tag".to_string()).to_string(),
            "Decryption failed: bad tag"
        );
    }

    #[test]
    fn test_runtime_error_is_transparent() {
        let err: RequestError = core_runtime::Error::Config("bad".to_string()).into();
        assert_eq!(err.to_string(), "Configuration error: bad");
    }
}
