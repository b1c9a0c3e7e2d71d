//! Spawning and timers for background dashboard tasks.
//!
//! Everything runs on one thread: the browser event loop, or a tokio
//! `LocalSet` natively. Tasks are `'static` but not `Send`, since they share
//! the session through `Rc<RefCell<..>>`.

use std::future::Future;
use std::time::Duration;

pub trait Runtime: Clone + 'static {
    /// Spawns a task on the current thread.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static;

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + 'static;
}

/// Tokio runtime for the CLI and tests. Must be used inside a
/// [`tokio::task::LocalSet`].
#[cfg(any(feature = "native", test))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioRuntime;

#[cfg(any(feature = "native", test))]
impl Runtime for TokioRuntime {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + 'static,
    {
        tokio::task::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + 'static {
        tokio::time::sleep(duration)
    }
}
