//! Reference background-work service.
//!
//! Wires the [`taskhook`] lifecycle into an Axum server: the listener is
//! drained on SIGTERM/SIGINT within the configured grace period, and the
//! internal health probe is guarded by the shared bearer secret.
//!
//! # Modules
//!
//! - [`handlers`] — Axum route handlers and router builder

pub mod handlers;

pub use handlers::{ServiceState, service_router};
