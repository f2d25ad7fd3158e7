//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, plus the
//! [`CancellationToken`] used to stop a request from any thread.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let mutex = Mutex::new(0);
//!     *mutex.lock().await += 1;
//!
//!     let token = CancellationToken::new();
//!     token.cancel();
//!     token.cancelled().await;
//! }
//! ```

pub use tokio::sync::{mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};
