//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with rustls (TLS 1.2 minimum, 10 s connect timeout)
//! - `FileSystemAccess` using `tokio::fs` under the platform cache directory
//! - `NetworkMonitor` using a TCP reachability probe
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient, TokioFileSystem};
//! use core_runtime::config::EngineConfig;
//! use std::sync::Arc;
//!
//! let config = EngineConfig::builder()
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .file_system(Arc::new(TokioFileSystem::new()))
//!     .network_monitor(Arc::new(DesktopNetworkMonitor::new()))
//!     .build()?;
//! ```

mod filesystem;
mod http;
mod network;

pub use filesystem::TokioFileSystem;
pub use http::{ReqwestHttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
pub use network::DesktopNetworkMonitor;
