//! Response decoders.
//!
//! A decoder turns the (decrypted) response body into the value delivered to
//! the listener. The engine picks nothing itself; the caller passes the
//! decoder when creating a request.

use crate::cipher::ResponseCipher;
use crate::error::DecodeError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Strategy that parses a plaintext response body.
pub trait ResponseDecoder: Send + Sync + 'static {
    type Output: Send + 'static;

    fn decode(&self, body: Bytes) -> Result<Self::Output, DecodeError>;
}

/// Passes the body through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl ResponseDecoder for RawDecoder {
    type Output = Bytes;

    fn decode(&self, body: Bytes) -> Result<Bytes, DecodeError> {
        Ok(body)
    }
}

/// Decodes the body as strict UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl ResponseDecoder for TextDecoder {
    type Output = String;

    fn decode(&self, body: Bytes) -> Result<String, DecodeError> {
        String::from_utf8(body.to_vec())
            .map_err(|e| DecodeError::Parse(format!("Body is not valid UTF-8: {}", e)))
    }
}

/// Deserializes the body as JSON into `T`.
pub struct JsonDecoder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDecoder<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> ResponseDecoder for JsonDecoder<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Output = T;

    fn decode(&self, body: Bytes) -> Result<T, DecodeError> {
        serde_json::from_slice(&body).map_err(|e| DecodeError::Parse(e.to_string()))
    }
}

/// Decoder backed by a closure.
pub struct FnDecoder<F> {
    decode: F,
}

/// Wrap a closure as a [`ResponseDecoder`].
///
/// ```
/// use core_request::decoder::{decode_with, ResponseDecoder};
///
/// let length = decode_with(|body| Ok(body.len()));
/// assert_eq!(length.decode("abc".into()).unwrap(), 3);
/// ```
pub fn decode_with<F, T>(decode: F) -> FnDecoder<F>
where
    F: Fn(Bytes) -> Result<T, DecodeError> + Send + Sync + 'static,
    T: Send + 'static,
{
    FnDecoder { decode }
}

impl<F, T> ResponseDecoder for FnDecoder<F>
where
    F: Fn(Bytes) -> Result<T, DecodeError> + Send + Sync + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn decode(&self, body: Bytes) -> Result<T, DecodeError> {
        (self.decode)(body)
    }
}

/// Decrypt with `cipher` when present, then run `decoder`.
///
/// A panicking decoder is reported as [`DecodeError::Panicked`].
pub(crate) fn decode_body<D: ResponseDecoder>(
    decoder: &D,
    cipher: Option<&dyn ResponseCipher>,
    body: Bytes,
) -> Result<D::Output, DecodeError> {
    let plaintext = match cipher {
        Some(cipher) => cipher.decrypt(&body)?,
        None => body,
    };

    catch_unwind(AssertUnwindSafe(|| decoder.decode(plaintext)))
        .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(payload))))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
