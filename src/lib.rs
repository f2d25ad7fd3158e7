//! Workspace façade crate.
//!
//! Host applications depend on `api-request-workspace` and get the request
//! engine (`core-request`) together with its runtime configuration and
//! logging (`core-runtime`), wired to the desktop bridges through the
//! `desktop-shims` feature.

#[cfg(feature = "desktop-shims")]
pub use core_request as request;
#[cfg(feature = "desktop-shims")]
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use core_request::{
    Outcome, RequestDescriptor, RequestEngine, RequestHandle, RequestListener, RequestTask,
};
#[cfg(feature = "desktop-shims")]
pub use core_runtime::config::EngineConfig;
