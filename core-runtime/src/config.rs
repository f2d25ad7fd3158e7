//! # Engine Configuration Module
//!
//! Provides the immutable configuration shared by every request.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `EngineConfig` holding the host bridges and the transport defaults. It
//! enforces fail-fast validation so a request never discovers a missing bridge
//! or a nonsensical timeout at execution time.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - One network attempt per call (desktop default: reqwest)
//! - `FileSystemAccess` - Cache directory and file I/O (desktop default: tokio fs)
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - Connectivity oracle. When absent, the network is
//!   assumed reachable and stale cache entries are never served.
//! - `Clock` - Time source for cache freshness (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop implementations of the
//! required bridges are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = EngineConfig::builder()
//!     .http_client(Arc::new(MyHttpClient))
//!     .file_system(Arc::new(MyFileSystem))
//!     .socket_timeout(Duration::from_secs(30))
//!     .default_retry_limit(5)
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! Missing bridges are reported as [`Error::CapabilityMissing`] with an
//! actionable message; invalid values as [`Error::Config`].

use crate::error::{Error, Result};
use bridge_traits::{Clock, FileSystemAccess, HttpClient, NetworkMonitor, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Default sub-directory of the host cache directory holding response files.
pub const DEFAULT_CACHE_SUBDIR: &str = "api";

/// Default time allowed to establish a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed for a response once connected.
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of network attempts per request.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default fixed delay between two network attempts.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Engine configuration.
///
/// Immutable once built. Share it between requests with an `Arc`; use
/// [`EngineConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct EngineConfig {
    /// Transport performing single network attempts
    pub http_client: Arc<dyn HttpClient>,

    /// Cache directory provisioning and file I/O
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Connectivity oracle (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Time source for cache freshness
    pub clock: Arc<dyn Clock>,

    /// Directory below the host cache directory that holds response files
    pub cache_subdir: String,

    /// Connect timeout used when the desktop transport is injected
    pub connect_timeout: Duration,

    /// Per-attempt timeout applied when a descriptor does not set its own
    pub socket_timeout: Duration,

    /// Attempts per request when a descriptor does not set its own budget
    pub default_retry_limit: u32,

    /// Fixed delay between attempts
    pub retry_backoff: Duration,
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("file_system", &"FileSystemAccess { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field("clock", &"Clock { ... }")
            .field("cache_subdir", &self.cache_subdir)
            .field("connect_timeout", &self.connect_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("default_retry_limit", &self.default_retry_limit)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

impl EngineConfig {
    /// Creates a new builder for constructing an `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Timeouts are non-zero
    /// - The retry limit allows at least one attempt
    /// - The cache sub-directory is a single, non-empty path segment
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout.is_zero() {
            return Err(Error::Config(
                "Connect timeout must be greater than zero".to_string(),
            ));
        }

        if self.socket_timeout.is_zero() {
            return Err(Error::Config(
                "Socket timeout must be greater than zero".to_string(),
            ));
        }

        if self.default_retry_limit == 0 {
            return Err(Error::Config(
                "Retry limit must allow at least one attempt".to_string(),
            ));
        }

        validate_cache_subdir(&self.cache_subdir)?;

        Ok(())
    }

    /// Whether a connectivity oracle reports a reachable network.
    ///
    /// Without a configured monitor the network is assumed reachable.
    pub async fn is_network_available(&self) -> bool {
        match &self.network_monitor {
            Some(monitor) => monitor.is_connected().await,
            None => true,
        }
    }
}

fn validate_cache_subdir(subdir: &str) -> Result<()> {
    if subdir.is_empty() {
        return Err(Error::Config(
            "Cache sub-directory cannot be empty".to_string(),
        ));
    }

    if subdir == "." || subdir == ".." || subdir.contains(['/', '\\']) {
        return Err(Error::Config(format!(
            "Cache sub-directory must be a single path segment, got '{}'",
            subdir
        )));
    }

    Ok(())
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the network. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack (URLSession/OkHttp)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn file_system_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required for the response cache. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default TokioFileSystem. \
                 Mobile: inject an adapter over the sandboxed app cache directory."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(
    connect_timeout: Duration,
    socket_timeout: Duration,
) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::try_with_timeouts(connect_timeout, socket_timeout)
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(
    _connect_timeout: Duration,
    _socket_timeout: Duration,
) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    Ok(Arc::new(TokioFileSystem::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(file_system_missing_error())
}

/// Builder for constructing an [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Option<Arc<dyn Clock>>,
    cache_subdir: Option<String>,
    connect_timeout: Option<Duration>,
    socket_timeout: Option<Duration>,
    default_retry_limit: Option<u32>,
    retry_backoff: Option<Duration>,
}

impl EngineConfigBuilder {
    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the file system access implementation.
    ///
    /// If not provided, the desktop default (tokio fs-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Sets the network monitor implementation (optional).
    ///
    /// The monitor decides whether a stale cache entry may be served in place
    /// of a network attempt.
    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    /// Sets the clock used for cache freshness.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the cache sub-directory name.
    ///
    /// Default: `"api"`
    pub fn cache_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.cache_subdir = Some(subdir.into());
        self
    }

    /// Sets the connect timeout of the injected desktop transport.
    ///
    /// Default: 10 seconds
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the default per-attempt timeout.
    ///
    /// Default: 10 seconds
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    /// Sets the default number of attempts per request.
    ///
    /// Default: 3
    pub fn default_retry_limit(mut self, limit: u32) -> Self {
        self.default_retry_limit = Some(limit);
        self
    }

    /// Sets the fixed delay between attempts.
    ///
    /// Default: 1 second
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = Some(backoff);
        self
    }

    /// Builds the final `EngineConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(EngineConfig)` on success, or an error if:
    /// - Required bridges are missing and no desktop default is available
    /// - Configuration values are invalid
    pub fn build(self) -> Result<EngineConfig> {
        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        let socket_timeout = self.socket_timeout.unwrap_or(DEFAULT_SOCKET_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(connect_timeout, socket_timeout)?,
        };

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let config = EngineConfig {
            http_client,
            file_system,
            network_monitor: self.network_monitor,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            cache_subdir: self
                .cache_subdir
                .unwrap_or_else(|| DEFAULT_CACHE_SUBDIR.to_string()),
            connect_timeout,
            socket_timeout,
            default_retry_limit: self.default_retry_limit.unwrap_or(DEFAULT_RETRY_LIMIT),
            retry_backoff: self.retry_backoff.unwrap_or(DEFAULT_RETRY_BACKOFF),
        };

        config.validate()?;

        Ok(config)
    }
}
