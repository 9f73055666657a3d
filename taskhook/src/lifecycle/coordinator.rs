//! The shutdown coordinator.
//!
//! On the first termination signal the coordinator starts two independent
//! tasks:
//!
//! - the **drain arm** closes the [`ListenerHandle`] and settles as
//!   [`ShutdownOutcome::Graceful`] once it has drained;
//! - the **grace arm** sleeps for the grace period and settles as
//!   [`ShutdownOutcome::Forced`].
//!
//! Whichever settles first consumes the finalize guard, runs the
//! [`Finalizer`] and exits the process with the outcome's exit code. The
//! other arm finds the guard consumed and does nothing, even when the
//! finalizer itself is what made it settle. Neither arm is cancelled.
//!
//! Signals after the first are ignored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::BoxFut;
use super::listener::ListenerHandle;
use super::signals::{SignalListener, SignalSource};
use super::state::{FinalizeGuard, ShutdownState, StateCell};

/// Error type a [`Finalizer`] may fail with.
pub type FinalizeError = Box<dyn std::error::Error + Send + Sync>;

/// Cleanup run once before the process exits (flush logs, close pools).
///
/// A failing finalizer is logged and otherwise ignored; it never changes the
/// exit code.
pub trait Finalizer: Send + Sync + 'static {
    /// Runs the cleanup.
    fn finalize(&self) -> BoxFut<'_, Result<(), FinalizeError>>;
}

impl<F, Fut> Finalizer for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), FinalizeError>> + Send + 'static,
{
    fn finalize(&self) -> BoxFut<'_, Result<(), FinalizeError>> {
        Box::pin(self())
    }
}

/// Terminates the process.
pub trait Exit: Send + Sync + 'static {
    /// Exits with `code`. Implementations used in production do not return.
    fn exit(&self, code: i32);
}

/// [`Exit`] implementation backed by [`std::process::exit`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExit;

impl Exit for ProcessExit {
    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Which race arm ended the shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownOutcome {
    /// The listener drained before the grace period elapsed.
    Graceful,
    /// The grace period elapsed first.
    Forced,
}

impl ShutdownOutcome {
    /// Process exit code for this outcome: `0` graceful, `1` forced.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Graceful => 0,
            Self::Forced => 1,
        }
    }
}

struct Core<X> {
    state: StateCell,
    guard: FinalizeGuard,
    grace_period: Duration,
    exit: X,
    outcome: watch::Sender<Option<ShutdownOutcome>>,
}

impl<X: Exit> Core<X> {
    /// Entry point for both race arms.
    ///
    /// The guard is consumed before the first await, so an arm that settles
    /// while the finalizer runs always sees it taken. The finalizer runs in
    /// its own task; an error or a panic there still ends in the exit call.
    async fn settle(&self, outcome: ShutdownOutcome, finalizer: &Arc<dyn Finalizer>) {
        if !self.guard.try_consume() {
            #[cfg(feature = "telemetry")]
            tracing::debug!(?outcome, "Shutdown already finalizing, ignoring late arm");
            return;
        }

        self.state
            .advance(ShutdownState::Draining, ShutdownState::Finalizing);

        #[cfg(feature = "telemetry")]
        match outcome {
            ShutdownOutcome::Graceful => tracing::info!("Listener drained, finalizing"),
            ShutdownOutcome::Forced => tracing::error!(
                grace_period = ?self.grace_period,
                "Grace period elapsed, forcing shutdown"
            ),
        }

        let finalizer = Arc::clone(finalizer);
        let finalized = tokio::spawn(async move { finalizer.finalize().await }).await;
        match finalized {
            Ok(Ok(())) => {}
            #[cfg(feature = "telemetry")]
            Ok(Err(err)) => tracing::warn!(error = %err, "Finalizer failed"),
            #[cfg(feature = "telemetry")]
            Err(err) => tracing::error!(error = %err, "Finalizer panicked"),
            #[cfg(not(feature = "telemetry"))]
            Ok(Err(_)) | Err(_) => {}
        }

        self.state
            .advance(ShutdownState::Finalizing, ShutdownState::Terminated);
        self.outcome.send_replace(Some(outcome));

        #[cfg(feature = "telemetry")]
        tracing::info!(exit_code = outcome.exit_code(), "Exiting");

        self.exit.exit(outcome.exit_code());
    }
}

/// Coordinates graceful shutdown of a single listener.
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use taskhook::lifecycle::{ServeHandle, ShutdownCoordinator};
///
/// let handle = ServeHandle::new();
/// // ... spawn the server on `handle` ...
///
/// let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
/// coordinator.setup(handle, || async {
///     // flush logs, close connections
///     Ok(())
/// })?;
/// coordinator.terminated().await;
/// ```
pub struct ShutdownCoordinator<X = ProcessExit> {
    core: Arc<Core<X>>,
}

impl<X> Clone for ShutdownCoordinator<X> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<X> std::fmt::Debug for ShutdownCoordinator<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("state", &self.core.state.get())
            .field("grace_period", &self.core.grace_period)
            .field("finalize_consumed", &self.core.guard.is_consumed())
            .finish_non_exhaustive()
    }
}

impl ShutdownCoordinator<ProcessExit> {
    /// Default grace period (5 seconds).
    pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

    /// Creates a coordinator that exits the process when shutdown completes.
    #[must_use]
    pub fn new(grace_period: Duration) -> Self {
        Self::with_exit(grace_period, ProcessExit)
    }
}

impl<X: Exit> ShutdownCoordinator<X> {
    /// Creates a coordinator that terminates through a custom [`Exit`].
    #[must_use]
    pub fn with_exit(grace_period: Duration, exit: X) -> Self {
        let (outcome, _) = watch::channel(None);
        Self {
            core: Arc::new(Core {
                state: StateCell::new(),
                guard: FinalizeGuard::new(),
                grace_period,
                exit,
                outcome,
            }),
        }
    }

    /// Returns the current shutdown phase.
    #[must_use]
    pub fn state(&self) -> ShutdownState {
        self.core.state.get()
    }

    /// Returns the configured grace period.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        self.core.grace_period
    }

    /// Returns the outcome once shutdown has terminated.
    #[must_use]
    pub fn outcome(&self) -> Option<ShutdownOutcome> {
        *self.core.outcome.borrow()
    }

    /// Waits until a race arm has run the finalizer and made the exit call.
    ///
    /// With [`ProcessExit`] the process is gone before this resolves, which
    /// makes it a convenient "park forever" for the main task.
    pub async fn terminated(&self) -> ShutdownOutcome {
        let mut rx = self.core.outcome.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                // The sender lives in `core`, which `self` keeps alive.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Registers SIGTERM and SIGINT handlers and drains `listener` on the first one.
    ///
    /// Call once at startup, from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    pub fn setup<L, F>(&self, listener: L, finalizer: F) -> Result<JoinHandle<()>, std::io::Error>
    where
        L: ListenerHandle,
        F: Finalizer,
    {
        let signals = SignalListener::try_new()?;
        Ok(self.run(signals, listener, finalizer))
    }

    /// Like [`Self::setup`], but reads signals from any [`SignalSource`].
    ///
    /// The returned task runs until the source is exhausted.
    pub fn run<S, L, F>(&self, mut signals: S, listener: L, finalizer: F) -> JoinHandle<()>
    where
        S: SignalSource,
        L: ListenerHandle,
        F: Finalizer,
    {
        let core = Arc::clone(&self.core);
        let finalizer: Arc<dyn Finalizer> = Arc::new(finalizer);
        let mut listener: Option<Box<dyn ListenerHandle>> = Some(Box::new(listener));

        tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                if !core
                    .state
                    .advance(ShutdownState::Running, ShutdownState::Draining)
                {
                    #[cfg(feature = "telemetry")]
                    tracing::debug!(%signal, "Shutdown already in progress, ignoring signal");
                    continue;
                }

                #[cfg(feature = "telemetry")]
                tracing::info!(
                    %signal,
                    grace_period = ?core.grace_period,
                    "Received termination signal, closing listener"
                );
                #[cfg(not(feature = "telemetry"))]
                let _ = signal;

                if let Some(listener) = listener.take() {
                    start_race(&core, listener, &finalizer);
                }
            }
        })
    }
}

/// Spawns the drain arm and the grace arm.
fn start_race<X: Exit>(
    core: &Arc<Core<X>>,
    listener: Box<dyn ListenerHandle>,
    finalizer: &Arc<dyn Finalizer>,
) {
    let drain_core = Arc::clone(core);
    let drain_finalizer = Arc::clone(finalizer);
    tokio::spawn(async move {
        listener.close().await;
        drain_core
            .settle(ShutdownOutcome::Graceful, &drain_finalizer)
            .await;
    });

    let grace_core = Arc::clone(core);
    let grace_finalizer = Arc::clone(finalizer);
    tokio::spawn(async move {
        tokio::time::sleep(grace_core.grace_period).await;
        grace_core
            .settle(ShutdownOutcome::Forced, &grace_finalizer)
            .await;
    });
}
