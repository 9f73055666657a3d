//! Termination signal handling.
//!
//! [`SignalListener`] registers OS handlers for the two termination requests
//! a service is expected to honour and yields them as [`TerminationSignal`]
//! values. On Unix it listens for SIGTERM and SIGINT. On Windows it listens
//! for Ctrl-C, which is reported as [`TerminationSignal::Interrupt`].
//!
//! The coordinator consumes signals through the [`SignalSource`] trait, so a
//! channel receiver can stand in for the OS in tests or be used to request a
//! shutdown programmatically:
//!
//! ```ignore
//! let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
//! coordinator.run(rx, listener, finalizer);
//! tx.send(TerminationSignal::Terminate)?;
//! ```

use std::fmt;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;

use super::BoxFut;

/// An external request for the process to terminate.
///
/// Both kinds are handled identically by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationSignal {
    /// `SIGTERM`, as sent by container runtimes and process supervisors.
    Terminate,
    /// `SIGINT`, or Ctrl-C on platforms without Unix signals.
    Interrupt,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => f.write_str("SIGTERM"),
            Self::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// A stream of termination signals.
///
/// `recv` resolves with the next signal, or `None` once the source can no
/// longer produce any.
pub trait SignalSource: Send + 'static {
    /// Waits for the next termination signal.
    fn recv(&mut self) -> BoxFut<'_, Option<TerminationSignal>>;
}

impl SignalSource for mpsc::UnboundedReceiver<TerminationSignal> {
    fn recv(&mut self) -> BoxFut<'_, Option<TerminationSignal>> {
        Box::pin(Self::recv(self))
    }
}

/// OS termination signal handlers.
///
/// Handlers stay installed for as long as the listener lives, so signals that
/// arrive after the first one are delivered here instead of killing the
/// process.
#[derive(Debug)]
pub struct SignalListener {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sigint: Signal,
    #[cfg(windows)]
    ctrl_c: tokio::signal::windows::CtrlC,
}

impl SignalListener {
    /// Registers handlers for both termination signal kinds.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if signal registration fails.
    pub fn try_new() -> Result<Self, std::io::Error> {
        #[cfg(unix)]
        {
            let sigterm = signal(SignalKind::terminate())?;
            let sigint = signal(SignalKind::interrupt())?;
            Ok(Self { sigterm, sigint })
        }

        #[cfg(windows)]
        {
            let ctrl_c = tokio::signal::windows::ctrl_c()?;
            Ok(Self { ctrl_c })
        }
    }

    /// Waits for the next termination signal.
    ///
    /// Returns `None` if the OS handlers were torn down.
    pub async fn next(&mut self) -> Option<TerminationSignal> {
        #[cfg(unix)]
        {
            tokio::select! {
                received = self.sigterm.recv() => received.map(|()| TerminationSignal::Terminate),
                received = self.sigint.recv() => received.map(|()| TerminationSignal::Interrupt),
            }
        }

        #[cfg(windows)]
        {
            self.ctrl_c
                .recv()
                .await
                .map(|()| TerminationSignal::Interrupt)
        }
    }
}

impl SignalSource for SignalListener {
    fn recv(&mut self) -> BoxFut<'_, Option<TerminationSignal>> {
        Box::pin(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
    }

    #[tokio::test]
    async fn test_channel_source_yields_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(TerminationSignal::Interrupt).unwrap();
        tx.send(TerminationSignal::Terminate).unwrap();
        drop(tx);

        let source: &mut dyn SignalSource = &mut rx;
        assert_eq!(source.recv().await, Some(TerminationSignal::Interrupt));
        assert_eq!(source.recv().await, Some(TerminationSignal::Terminate));
        assert_eq!(source.recv().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_listener_registers_handlers() {
        let listener = SignalListener::try_new();
        assert!(listener.is_ok());
    }
}
