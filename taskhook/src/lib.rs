#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Process lifecycle control for background-work services.
//!
//! Services built on this crate do work on behalf of an external job
//! scheduler. They need two things from their runtime plumbing: a shutdown
//! path that drains the HTTP listener within a bounded grace period and runs
//! cleanup exactly once, and a way to tell the scheduler how a unit of work
//! ended.
//!
//! # Modules
//!
//! - [`lifecycle`] - Termination signals, shutdown state and the [`ShutdownCoordinator`]
//! - [`scheduler`] - Authenticated task status callbacks to the scheduler
//! - [`auth`] - Bearer credentials for the internal service API
//! - [`config`] - Process-wide configuration read from the environment
//! - [`secrets`] - Docker-style secret files mounted under `/run/secrets`
//! - [`error`] - Error types shared across the crate
//!
//! # Feature Flags
//!
//! - `cli` - Derives `clap` arguments for [`config::BindArgs`]
//! - `telemetry` - Enables tracing instrumentation for shutdown and reporting

pub mod auth;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod scheduler;
pub mod secrets;

pub use config::ServiceConfig;
pub use error::{ConfigError, ReportError};
pub use lifecycle::{ShutdownCoordinator, ShutdownOutcome, ShutdownState, TerminationSignal};
pub use scheduler::{SchedulerReporter, TaskReport, TaskStatus};
