//! # Core Request
//!
//! Resilient HTTP request engine: optional time-based response caching,
//! bounded retries with a fixed backoff, optional AES-256-GCM decryption of
//! response bodies, pluggable decoding, and a single terminal outcome per
//! request delivered to a listener.
//!
//! ## Overview
//!
//! - [`RequestDescriptor`] describes one call (method, URL, query, headers,
//!   at most one body, cache TTL, retry budget, timeout, decryption key).
//! - [`RequestEngine`] holds the shared [`EngineConfig`] and turns a
//!   descriptor plus a [`ResponseDecoder`] into a [`RequestTask`].
//! - [`RequestTask::execute`] runs inline; [`RequestTask::spawn`] runs on a
//!   background task and reports to a [`RequestListener`].
//!
//! ## Example
//!
//! ```ignore
//! use core_request::{JsonDecoder, Outcome, RequestDescriptor, RequestEngine};
//!
//! let engine = RequestEngine::with_desktop_defaults()?;
//! let descriptor = RequestDescriptor::get("https://api.example.com/tracks")
//!     .query("page", "1")
//!     .retry_limit(5)
//!     .build()?;
//!
//! match engine.request(descriptor, JsonDecoder::<Vec<Track>>::new()).execute().await {
//!     Some(Outcome::Success(tracks)) => println!("{} tracks", tracks.len()),
//!     Some(other) => eprintln!("request failed: {}", other),
//!     None => {}
//! }
//! ```
//!
//! [`EngineConfig`]: core_runtime::config::EngineConfig

pub mod body;
pub mod cache;
pub mod cipher;
pub mod decoder;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod listener;
pub mod outcome;
pub mod retry;
pub mod task;

pub use body::{MultipartForm, MultipartPart, RequestBody};
pub use cache::{CacheEntry, CacheStore};
pub use cipher::{DecryptionKey, ResponseCipher};
pub use decoder::{decode_with, JsonDecoder, RawDecoder, ResponseDecoder, TextDecoder};
pub use descriptor::{QueryParam, RequestDescriptor, RequestDescriptorBuilder};
pub use engine::RequestEngine;
pub use error::{DecodeError, RequestError, Result};
pub use listener::RequestListener;
pub use outcome::Outcome;
pub use retry::{RetryPolicy, RetryResult};
pub use task::{RequestHandle, RequestTask, TaskState};
