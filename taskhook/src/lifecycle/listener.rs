//! Network listener handles.
//!
//! A [`ListenerHandle`] is whatever the coordinator has to close when a
//! termination signal arrives. Closing stops accepting new connections and
//! resolves once in-flight work has drained.
//!
//! [`ServeHandle`] covers the common case of a server future that supports a
//! graceful-shutdown trigger, such as `axum::serve(..).with_graceful_shutdown(..)`:
//!
//! ```ignore
//! let handle = ServeHandle::new();
//! let token = handle.cancellation_token();
//! handle.spawn(async move {
//!     axum::serve(listener, app)
//!         .with_graceful_shutdown(token.cancelled_owned())
//!         .await
//! });
//! coordinator.setup(handle, finalizer)?;
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::BoxFut;

/// An active listener that can be drained.
pub trait ListenerHandle: Send + 'static {
    /// Stops accepting new work and resolves once in-flight work has drained.
    ///
    /// Called at most once.
    fn close(self: Box<Self>) -> BoxFut<'static, ()>;
}

impl<F, Fut> ListenerHandle for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn close(self: Box<Self>) -> BoxFut<'static, ()> {
        Box::pin((*self)())
    }
}

/// Listener handle backed by a cancellation token and a task tracker.
///
/// Server tasks started through [`ServeHandle::spawn`] are expected to stop
/// accepting connections once the token is cancelled. Closing the handle
/// cancels the token and waits for every tracked task to finish.
#[allow(missing_debug_implementations)] // TaskTracker doesn't impl Debug
pub struct ServeHandle {
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl Default for ServeHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ServeHandle {
    /// Creates a handle with no tracked tasks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the token that tells server tasks to stop accepting.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Spawns a server task whose completion counts towards draining.
    ///
    /// The task's output is discarded; servers that can fail should log
    /// their own errors.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.task_tracker.spawn(task);
    }

    /// Returns `true` once a close has been requested.
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

impl ListenerHandle for ServeHandle {
    fn close(self: Box<Self>) -> BoxFut<'static, ()> {
        let Self {
            task_tracker,
            cancellation_token,
        } = *self;
        Box::pin(async move {
            cancellation_token.cancel();
            task_tracker.close();
            task_tracker.wait().await;
        })
    }
}
