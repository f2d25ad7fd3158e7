//! Async facade for the request engine.
//!
//! Engine crates depend on this crate instead of naming Tokio directly for
//! task spawning, timers, synchronization and file I/O. Keeping the surface in
//! one place means the background execution model of a request (one spawned
//! task, cooperative cancellation, fixed-delay sleeps) is defined once.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, timeout, instants
//! - `sync`: Locks, channels and the [`CancellationToken`](sync::CancellationToken)
//! - `fs`: File system re-exports
//! - `runtime`: Blocking entry points for synchronous callers
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let token = CancellationToken::new();
//!     let child = token.clone();
//!
//!     let handle = core_async::spawn(async move {
//!         core_async::select! {
//!             _ = child.cancelled() => None,
//!             _ = sleep(Duration::from_secs(1)) => Some(42),
//!         }
//!     });
//!
//!     token.cancel();
//!     assert_eq!(handle.await.unwrap(), None);
//! }
//! ```

pub mod fs;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};

pub use tokio::select;
