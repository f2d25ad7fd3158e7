//! # Host Bridge Traits
//!
//! Capability contracts between the request engine and the host platform.
//!
//! ## Overview
//!
//! The engine orchestrates around capabilities it does not implement itself:
//! sending bytes over HTTP, asking whether a network is reachable, and storing
//! files in a cache directory. Each capability is a trait here; each platform
//! ships an adapter (desktop adapters live in `bridge-desktop`).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - One HTTP attempt per call (Transport)
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity oracle
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Cache directory and file I/O
//! - [`Clock`](time::Clock) - Time source for cache freshness
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Transport
//! implementations must map certificate and handshake failures to
//! `BridgeError::Security` and everything else that prevents a response from
//! arriving to `BridgeError::Transport`; the engine's retry policy depends on
//! that split.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`: one engine configuration is shared
//! by every request task.

pub mod error;
pub mod http;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
