//! Shutdown state machine and the one-shot finalize guard.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Phase of a coordinator's shutdown sequence.
///
/// Phases only ever move forward:
/// `Running -> Draining -> Finalizing -> Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ShutdownState {
    /// Serving normally; no termination signal seen yet.
    Running = 0,
    /// A signal arrived; the listener is closing and the grace timer runs.
    Draining = 1,
    /// One of the race arms won and the finalizer is running.
    Finalizing = 2,
    /// The finalizer returned and the exit call has been made.
    Terminated = 3,
}

impl ShutdownState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            2 => Self::Finalizing,
            _ => Self::Terminated,
        }
    }
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Finalizing => "finalizing",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Atomic cell holding a [`ShutdownState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(ShutdownState::Running as u8))
    }

    pub(crate) fn get(&self) -> ShutdownState {
        ShutdownState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to` if the cell currently holds `from`.
    ///
    /// Returns `false` when another transition got there first.
    pub(crate) fn advance(&self, from: ShutdownState, to: ShutdownState) -> bool {
        debug_assert!(from < to);
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// One-shot token that lets exactly one caller run the finalizer.
#[derive(Debug, Default)]
pub(crate) struct FinalizeGuard(AtomicBool);

impl FinalizeGuard {
    pub(crate) const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Consumes the guard. Only the first caller ever gets `true`.
    pub(crate) fn try_consume(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_consumed(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
