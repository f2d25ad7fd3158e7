//! Retry loop around single transport attempts.

use bridge_traits::{error::Result as BridgeResult, HttpClient, HttpRequest, HttpResponse};
use core_async::sync::CancellationToken;
use core_async::time::sleep;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// How the retry loop ended.
#[derive(Debug)]
pub enum RetryResult {
    /// A 2xx, 4xx or 5xx response. Status handling is up to the caller.
    Response(HttpResponse),
    /// Every attempt failed; carries the last failure reason.
    Exhausted { attempts: u32, reason: String },
    /// A certificate or handshake failure; never retried.
    SecurityFault(String),
    Cancelled,
}

/// Result of a single attempt.
enum AttemptResult {
    Terminal(HttpResponse),
    Failed(String),
    Fatal(String),
}

/// Drives up to `max_attempts` transport calls, sleeping `backoff` between
/// failed ones. Both the transport call and the sleep race the token.
pub struct RetryController<'a> {
    client: &'a dyn HttpClient,
    policy: RetryPolicy,
    token: &'a CancellationToken,
}

impl<'a> RetryController<'a> {
    pub fn new(client: &'a dyn HttpClient, policy: RetryPolicy, token: &'a CancellationToken) -> Self {
        Self {
            client,
            policy,
            token,
        }
    }

    /// Run the loop. `build` produces the request for attempt `n` (1-based);
    /// a build failure counts as a failed attempt.
    pub async fn run<F, Fut>(&self, mut build: F) -> RetryResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = BridgeResult<HttpRequest>>,
    {
        let mut last_reason = String::new();

        for attempt in 1..=self.policy.max_attempts {
            if self.token.is_cancelled() {
                return RetryResult::Cancelled;
            }

            let result = core_async::select! {
                _ = self.token.cancelled() => return RetryResult::Cancelled,
                result = self.attempt(&mut build, attempt) => result,
            };

            match result {
                AttemptResult::Terminal(response) => return RetryResult::Response(response),
                AttemptResult::Fatal(reason) => {
                    warn!(attempt, reason = %reason, "Security failure, not retrying");
                    return RetryResult::SecurityFault(reason);
                }
                AttemptResult::Failed(reason) => {
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        reason = %reason,
                        "Attempt failed"
                    );
                    last_reason = reason;
                }
            }

            if attempt < self.policy.max_attempts {
                core_async::select! {
                    _ = self.token.cancelled() => return RetryResult::Cancelled,
                    _ = sleep(self.policy.backoff) => {}
                }
            }
        }

        RetryResult::Exhausted {
            attempts: self.policy.max_attempts,
            reason: last_reason,
        }
    }

    async fn attempt<F, Fut>(&self, build: &mut F, attempt: u32) -> AttemptResult
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = BridgeResult<HttpRequest>>,
    {
        let request = match build(attempt).await {
            Ok(request) => request,
            Err(e) if e.is_security_fault() => return AttemptResult::Fatal(e.to_string()),
            Err(e) => return AttemptResult::Failed(format!("Failed to build request: {}", e)),
        };

        debug!(attempt, method = %request.method, url = %request.url, "Sending request");

        match self.client.execute(request).await {
            Ok(response) => match response.status_class() {
                2 | 4 | 5 => AttemptResult::Terminal(response),
                _ => AttemptResult::Failed(format!("Unexpected HTTP status {}", response.status)),
            },
            Err(e) if e.is_security_fault() => AttemptResult::Fatal(e.to_string()),
            Err(e) => AttemptResult::Failed(e.to_string()),
        }
    }
}
