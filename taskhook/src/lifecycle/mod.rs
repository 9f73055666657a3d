//! Process shutdown lifecycle.
//!
//! # Architecture
//!
//! A [`ShutdownCoordinator`] owns the shutdown state of one service. At
//! startup the service hands it a [`ListenerHandle`] and a [`Finalizer`]
//! through [`ShutdownCoordinator::setup`], which installs handlers for both
//! [`TerminationSignal`] kinds. The first signal moves the coordinator from
//! [`ShutdownState::Running`] to [`ShutdownState::Draining`] and races the
//! listener drain against the grace period; the winner runs the finalizer
//! once and exits with `0` (drained) or `1` (grace period elapsed).
//!
//! - [`coordinator`] - The coordinator, [`Finalizer`] and [`Exit`] seams
//! - [`listener`] - [`ListenerHandle`] and the token-based [`ServeHandle`]
//! - [`signals`] - [`TerminationSignal`] and OS signal registration
//! - [`state`] - [`ShutdownState`]

pub mod coordinator;
pub mod listener;
pub mod signals;
pub mod state;

use std::future::Future;
use std::pin::Pin;

pub use coordinator::{
    Exit, FinalizeError, Finalizer, ProcessExit, ShutdownCoordinator, ShutdownOutcome,
};
pub use listener::{ListenerHandle, ServeHandle};
pub use signals::{SignalListener, SignalSource, TerminationSignal};
pub use state::ShutdownState;

/// Boxed, `Send` future used at the lifecycle trait seams.
pub type BoxFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
