//! Listener contract and single-shot delivery.

use crate::outcome::Outcome;
use core_async::sync::CancellationToken;
use std::sync::{Arc, Mutex, TryLockError};
use tracing::debug;

/// Receives the terminal outcome of a spawned request.
///
/// Exactly one method group is called per request, on the request's
/// background task, after the request has completed. Nothing is called for a
/// cancelled request.
pub trait RequestListener<T>: Send + Sync {
    fn on_complete(&self, value: T);

    fn on_network_error(&self, message: &str);

    fn on_http_status_error(&self, code: u16);

    /// Called right after [`on_http_status_error`](Self::on_http_status_error)
    /// with the response body.
    fn on_http_status_error_with_body(&self, _code: u16, _body: &str) {}

    /// Decryption or parse failure. Forwards to
    /// [`on_network_error`](Self::on_network_error) unless overridden.
    fn on_decode_error(&self, message: &str) {
        self.on_network_error(message);
    }
}

/// Holds the listener until the outcome is delivered or the request is
/// cancelled, whichever comes first.
pub(crate) struct ListenerDispatch<T> {
    slot: Mutex<Option<Arc<dyn RequestListener<T>>>>,
    token: CancellationToken,
}

impl<T> ListenerDispatch<T> {
    pub(crate) fn new(listener: Arc<dyn RequestListener<T>>, token: CancellationToken) -> Self {
        Self {
            slot: Mutex::new(Some(listener)),
            token,
        }
    }

    /// Deliver `outcome` unless the request was cancelled. Returns whether a
    /// listener was called.
    pub(crate) fn deliver(&self, outcome: Outcome<T>) -> bool {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if self.token.is_cancelled() {
            slot.take();
            return false;
        }

        let Some(listener) = slot.take() else {
            return false;
        };

        debug!(outcome = outcome.kind(), "Delivering outcome");

        // The lock stays held so a concurrent cancel cannot return while a
        // delivery it did not observe is still starting.
        match outcome {
            Outcome::Success(value) => listener.on_complete(value),
            Outcome::NetworkError(message) => listener.on_network_error(&message),
            Outcome::HttpStatusError { code, body } => {
                listener.on_http_status_error(code);
                listener.on_http_status_error_with_body(code, &body);
            }
            Outcome::DecodeError(message) => listener.on_decode_error(&message),
        }

        true
    }
}

/// Type-erased view used by the request handle.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self);
}

impl<T: Send> Detach for ListenerDispatch<T> {
    /// Drop the listener. If a delivery is running right now (possibly on
    /// this very thread, from inside a callback) it is left to finish.
    fn detach(&self) {
        match self.slot.try_lock() {
            Ok(mut slot) => {
                slot.take();
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                poisoned.into_inner().take();
            }
            Err(TryLockError::WouldBlock) => {}
        }
    }
}
