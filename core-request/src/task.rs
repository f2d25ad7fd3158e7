//! # Request Task
//!
//! One execution of one [`RequestDescriptor`], driven through a small state
//! machine:
//!
//! ```text
//! Idle -> CacheCheck -> CacheServe ------------------> Decoding -> Completed
//!              \                                       ^
//!               `---> NetworkAttempt (retry loop) ----'
//! ```
//!
//! `CacheCheck` only happens when the descriptor carries a TTL. A 4xx/5xx
//! response, an exhausted retry budget and a security fault all skip
//! `Decoding` and complete directly.
//!
//! A task is consumed either inline with [`RequestTask::execute`] or on a
//! background task with [`RequestTask::spawn`], which reports the outcome to a
//! [`RequestListener`] and returns a [`RequestHandle`] for cancellation.

use crate::cache::CacheStore;
use crate::decoder::{decode_body, ResponseDecoder};
use crate::descriptor::RequestDescriptor;
use crate::listener::{Detach, ListenerDispatch, RequestListener};
use crate::outcome::Outcome;
use crate::retry::{RetryController, RetryPolicy, RetryResult};
use bridge_traits::{error::Result as BridgeResult, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_async::sync::CancellationToken;
use core_async::task::JoinHandle;
use core_runtime::config::EngineConfig;
use core_runtime::logging::redact_if_sensitive;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Phases of a request execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    CacheCheck,
    CacheServe,
    NetworkAttempt,
    Decoding,
    Completed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskState::Idle => "idle",
            TaskState::CacheCheck => "cache_check",
            TaskState::CacheServe => "cache_serve",
            TaskState::NetworkAttempt => "network_attempt",
            TaskState::Decoding => "decoding",
            TaskState::Completed => "completed",
        };
        f.write_str(name)
    }
}

fn enter(state: TaskState) {
    debug!(state = %state, "Request state");
}

/// Why a request ended before `Decoding`.
enum FetchFailure {
    Network(String),
    Status { code: u16, body: String },
    Cancelled,
}

impl FetchFailure {
    fn into_outcome<T>(self) -> Outcome<T> {
        match self {
            FetchFailure::Network(message) => Outcome::NetworkError(message),
            FetchFailure::Status { code, body } => Outcome::HttpStatusError { code, body },
            // Never delivered: the caller re-checks the token.
            FetchFailure::Cancelled => Outcome::NetworkError("Request cancelled".to_string()),
        }
    }
}

/// A prepared, not yet started request.
pub struct RequestTask<D: ResponseDecoder> {
    config: Arc<EngineConfig>,
    cache: CacheStore,
    descriptor: RequestDescriptor,
    decoder: D,
    token: CancellationToken,
}

impl<D: ResponseDecoder> RequestTask<D> {
    pub(crate) fn new(config: Arc<EngineConfig>, descriptor: RequestDescriptor, decoder: D) -> Self {
        let cache = CacheStore::from_config(&config);
        Self {
            config,
            cache,
            descriptor,
            decoder,
            token: CancellationToken::new(),
        }
    }

    pub fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Token that cancels this task. Cancelling before `execute` or `spawn`
    /// makes the task complete without an outcome.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run the request to completion on the current task.
    ///
    /// Returns `None` when the request was cancelled.
    pub async fn execute(self) -> Option<Outcome<D::Output>> {
        let token = self.token.clone();

        let outcome = core_async::select! {
            biased;
            _ = token.cancelled() => None,
            outcome = self.run() => Some(outcome),
        };

        if token.is_cancelled() {
            debug!(url = %self.descriptor.base_url(), "Request cancelled, dropping outcome");
            return None;
        }

        outcome
    }

    /// Run the request on a background task and report the outcome to
    /// `listener`, which is called on that background task.
    pub fn spawn(self, listener: Arc<dyn RequestListener<D::Output>>) -> RequestHandle {
        let token = self.token.clone();
        let dispatch = Arc::new(ListenerDispatch::new(listener, token.clone()));
        let delivery = Arc::clone(&dispatch);

        let join = core_async::spawn(async move {
            if let Some(outcome) = self.execute().await {
                delivery.deliver(outcome);
            }
        });

        RequestHandle {
            token,
            join,
            dispatch,
        }
    }

    #[instrument(
        skip(self),
        fields(method = %self.descriptor.method(), url = %self.descriptor.base_url())
    )]
    async fn run(&self) -> Outcome<D::Output> {
        enter(TaskState::Idle);

        let body = match self.fetch().await {
            Ok(body) => body,
            Err(failure) => {
                enter(TaskState::Completed);
                return failure.into_outcome();
            }
        };

        enter(TaskState::Decoding);
        let outcome = match decode_body(&self.decoder, self.descriptor.cipher(), body) {
            Ok(value) => Outcome::Success(value),
            Err(e) => {
                warn!(error = %e, "Failed to decode response");
                Outcome::DecodeError(e.to_string())
            }
        };

        enter(TaskState::Completed);
        info!(outcome = outcome.kind(), "Request completed");
        outcome
    }

    /// Produce the body to decode, from cache or network.
    async fn fetch(&self) -> Result<Bytes, FetchFailure> {
        if let Some(ttl) = self.descriptor.cache_ttl() {
            enter(TaskState::CacheCheck);

            match self.cache.lookup(&self.descriptor).await {
                Ok(entry) if entry.exists => {
                    let fresh = self.cache.is_fresh(&entry, ttl);
                    if fresh || !self.config.is_network_available().await {
                        enter(TaskState::CacheServe);
                        debug!(fresh, "Serving response from cache");
                        return self.cache.read(&entry).await.map_err(|e| {
                            FetchFailure::Network(format!("Failed to read cached response: {}", e))
                        });
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Cache lookup failed, treating as miss"),
            }
        }

        enter(TaskState::NetworkAttempt);
        let policy = RetryPolicy::new(
            self.descriptor
                .retry_limit()
                .unwrap_or(self.config.default_retry_limit),
            self.config.retry_backoff,
        );
        let controller = RetryController::new(self.config.http_client.as_ref(), policy, &self.token);

        match controller
            .run(|attempt| self.build_http_request(attempt))
            .await
        {
            RetryResult::Response(response) => self.handle_response(response).await,
            RetryResult::Exhausted { attempts, reason } => {
                warn!(attempts, reason = %reason, "Retry budget exhausted");
                Err(FetchFailure::Network(reason))
            }
            RetryResult::SecurityFault(reason) => Err(FetchFailure::Network(reason)),
            RetryResult::Cancelled => Err(FetchFailure::Cancelled),
        }
    }

    async fn handle_response(&self, response: HttpResponse) -> Result<Bytes, FetchFailure> {
        let code = response.status;

        if response.is_success() {
            debug!(status = code, size = response.body.len(), "Received response");
            if self.descriptor.is_cacheable() {
                if let Err(e) = self.cache.put(&self.descriptor, response.body.clone()).await {
                    warn!(error = %e, "Failed to cache response");
                }
            }
            return Ok(response.body);
        }

        if response.is_client_error() {
            warn!(status = code, "HTTP client error");
        } else {
            warn!(status = code, "HTTP server error");
        }

        Err(FetchFailure::Status {
            code,
            body: response.text_lossy(),
        })
    }

    /// Build the transport request for one attempt. Encodes the body afresh
    /// so file bodies are re-read on every attempt.
    async fn build_http_request(&self, attempt: u32) -> BridgeResult<HttpRequest> {
        let timeout = self
            .descriptor
            .socket_timeout()
            .unwrap_or(self.config.socket_timeout);

        let mut request =
            HttpRequest::new(self.descriptor.method(), self.descriptor.full_url()).timeout(timeout);

        for (name, value) in self.descriptor.headers() {
            debug!(attempt, header = %name, value = %redact_if_sensitive(name, value), "Request header");
            request = request.header(name.clone(), value.clone());
        }

        if let Some(body) = self.descriptor.body() {
            let encoded = body.encode(self.config.file_system.as_ref()).await?;
            if self.descriptor.header_value("Content-Type").is_none() {
                request = request.header("Content-Type", body.content_type());
            }
            request = request.body(encoded);
        }

        Ok(request)
    }
}

/// Handle to a spawned request.
///
/// Dropping the handle does not cancel the request.
pub struct RequestHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
    dispatch: Arc<dyn Detach>,
}

impl RequestHandle {
    /// Stop the request. No listener method starts after this returns; an
    /// in-flight transport call is abandoned.
    ///
    /// Safe to call from inside a listener callback.
    pub fn cancel(&self) {
        self.token.cancel();
        self.dispatch.detach();
        debug!("Request cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the background task has finished, including delivery.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the background task, including delivery, to finish.
    pub async fn join(self) -> core_async::task::Result<()> {
        self.join.await
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("cancelled", &self.token.is_cancelled())
            .field("finished", &self.join.is_finished())
            .finish()
    }
}
