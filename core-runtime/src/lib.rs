//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the request engine:
//! - Engine configuration (bridges, timeouts, retry and cache defaults)
//! - Logging and tracing setup
//! - Runtime error type
//!
//! ## Overview
//!
//! [`EngineConfig`](config::EngineConfig) is built once, validated, and then
//! shared read-only by every request through an `Arc`. Nothing in this crate
//! holds global mutable state except the `tracing` subscriber installed by
//! [`init_logging`](logging::init_logging).

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
