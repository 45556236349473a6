//! Tokio runtime that hosts task actions and completion callbacks.

use std::future::Future;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

/// Tokio-based spawner that executes actions on a multi-thread runtime.
///
/// Worker threads are plain OS threads that `block_on` this runtime's handle
/// while racing an action against its deadline. Actions themselves run as
/// spawned tasks, so a panic is caught at the join handle and a timed-out
/// action can be left running detached.
pub struct TokioSpawner {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` with a new multi-threaded runtime with
    /// `worker_threads` threads. The runtime lives as long as the spawner.
    pub fn with_worker_threads(worker_threads: usize) -> Result<Self, std::io::Error> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("tq-action")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            runtime: Some(runtime),
            handle,
        })
    }

    /// Spawn a future; dropping the returned handle detaches it.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }

    /// Run a blocking closure on the runtime's blocking pool without waiting
    /// for it.
    pub fn spawn_detached_blocking<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        drop(self.handle.spawn_blocking(f));
    }

    /// Drive `fut` to completion on the calling thread. Must not be called
    /// from inside an async context.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        self.handle.block_on(fut)
    }
}

impl Drop for TokioSpawner {
    fn drop(&mut self) {
        // The last owner may be a worker thread or an async test; neither may
        // block on runtime teardown.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl std::fmt::Debug for TokioSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSpawner")
            .field("owns_runtime", &self.runtime.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_and_block_on() {
        let spawner = TokioSpawner::with_worker_threads(2).unwrap();
        let handle = spawner.spawn(async { 21 * 2 });
        assert_eq!(spawner.block_on(handle).unwrap(), 42);
    }

    #[test]
    fn test_panic_is_caught_at_join() {
        let spawner = TokioSpawner::with_worker_threads(1).unwrap();
        let handle = spawner.spawn(async { panic!("boom") });
        let err = spawner.block_on(handle).unwrap_err();
        assert!(err.is_panic());
    }
}
