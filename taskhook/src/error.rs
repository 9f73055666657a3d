//! Error types for taskhook.

use std::path::PathBuf;

use http::StatusCode;

/// Errors raised while reading process configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    #[error("missing configuration: {name} is required")]
    Missing {
        /// Name of the variable.
        name: &'static str,
    },

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Name of the variable.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A secret file could not be read.
    #[error("failed to read secret file {}: {source}", path.display())]
    SecretFile {
        /// Path of the secret file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while reporting a task status to the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// The callback URL could not be built.
    #[error("URL error: {context}")]
    Url {
        /// Human-readable context.
        context: &'static str,
    },

    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The scheduler answered with a non-success status.
    #[error("Unexpected HTTP status {status}: {context}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
    },
}
