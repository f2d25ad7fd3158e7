//! Runtime utilities for synchronous callers.
//!
//! Hosts that are not async themselves (CLI tools, FFI shims) can drive a
//! request to completion with [`block_on`].

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// Returns an error if the runtime cannot be created.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}
