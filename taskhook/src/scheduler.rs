//! Task status callbacks to the scheduler.
//!
//! When a service finishes a unit of work it tells the scheduler how it went:
//!
//! ```text
//! POST <origin>/task/<transaction_id>/callback/<service_name>?status=<status>
//! authorization: bearer <secret>
//! ```
//!
//! The request has an empty body and any 2xx response counts as delivered.
//!
//! ## Delivery
//!
//! Reporting is best effort and at most once: [`SchedulerReporter::report`]
//! sends exactly one request and turns every failure into `false`. Callers
//! that need retries build them on top of [`SchedulerReporter::try_report`].

use std::fmt;
use std::time::Duration;

use http::HeaderMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth;
use crate::config::ServiceConfig;
use crate::error::ReportError;

const CONTEXT: &str = "POST /task/{id}/callback/{service}";

/// Terminal status of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// The work completed.
    Ok,
    /// The work failed.
    Error,
}

impl TaskStatus {
    /// Wire representation used in the `status` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<T, E> From<&Result<T, E>> for TaskStatus {
    fn from(result: &Result<T, E>) -> Self {
        if result.is_ok() { Self::Ok } else { Self::Error }
    }
}

/// A status report for one unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    /// Scheduler-side identifier of the unit of work.
    pub transaction_id: String,
    /// How the work ended.
    pub status: TaskStatus,
    /// Name of the reporting service.
    pub service_name: String,
}

impl TaskReport {
    /// Builds the callback URL for this report under `origin`.
    ///
    /// Path segments are percent-encoded; `status` is the only query parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Url`] if `origin` cannot carry a path.
    pub fn callback_url(&self, origin: &Url) -> Result<Url, ReportError> {
        let mut url = origin.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|()| ReportError::Url {
                context: "scheduler origin cannot be a base URL",
            })?
            .pop_if_empty()
            .extend([
                "task",
                self.transaction_id.as_str(),
                "callback",
                self.service_name.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("status", self.status.as_str());
        Ok(url)
    }
}

/// Sends [`TaskReport`]s to the scheduler on behalf of one service.
#[derive(Clone)]
pub struct SchedulerReporter {
    /// Scheduler origin, e.g. `http://scheduler`
    origin: Url,
    /// This service's name as known to the scheduler
    service_name: String,
    /// Pre-built bearer credential
    headers: HeaderMap,
    /// Shared Reqwest HTTP client
    client: Client,
    /// Optional request timeout
    timeout: Option<Duration>,
}

impl fmt::Debug for SchedulerReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerReporter")
            .field("origin", &self.origin.as_str())
            .field("service_name", &self.service_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SchedulerReporter {
    /// Creates a reporter.
    ///
    /// # Errors
    ///
    /// Returns [`http::header::InvalidHeaderValue`] if `secret` cannot be sent
    /// in a header.
    pub fn new(
        origin: Url,
        service_name: impl Into<String>,
        secret: &str,
    ) -> Result<Self, http::header::InvalidHeaderValue> {
        Ok(Self {
            origin,
            service_name: service_name.into(),
            headers: auth::auth_headers(secret)?,
            client: Client::new(),
            timeout: None,
        })
    }

    /// Creates a reporter from the process configuration.
    ///
    /// # Errors
    ///
    /// Returns [`http::header::InvalidHeaderValue`] if the configured secret
    /// cannot be sent in a header.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, http::header::InvalidHeaderValue> {
        Self::new(
            config.scheduler_origin.clone(),
            config.service_name.clone(),
            &config.internal_api_secret,
        )
    }

    /// Uses a caller-provided HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sets a timeout for every report request. Unset by default.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the scheduler origin.
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Returns the name this reporter reports as.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Returns the configured timeout, if any.
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Builds the report for a unit of work.
    #[must_use]
    pub fn task_report(&self, transaction_id: impl Into<String>, status: TaskStatus) -> TaskReport {
        TaskReport {
            transaction_id: transaction_id.into(),
            status,
            service_name: self.service_name.clone(),
        }
    }

    /// Reports the terminal status of a unit of work.
    ///
    /// Returns `true` if the scheduler answered with a 2xx status. Any other
    /// status, and any transport failure, yields `false`. Exactly one request
    /// is sent.
    pub async fn report(&self, transaction_id: &str, status: TaskStatus) -> bool {
        match self.try_report(transaction_id, status).await {
            Ok(()) => true,
            #[cfg(feature = "telemetry")]
            Err(err) => {
                tracing::error!(
                    transaction_id,
                    %status,
                    error = %err,
                    "Scheduler callback did not respond OK"
                );
                false
            }
            #[cfg(not(feature = "telemetry"))]
            Err(_) => false,
        }
    }

    /// Like [`Self::report`], but returns the failure.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the URL cannot be built, the request fails
    /// in transport, or the scheduler answers with a non-2xx status.
    #[cfg_attr(
        feature = "telemetry",
        tracing::instrument(name = "taskhook.scheduler.report", skip(self), err)
    )]
    pub async fn try_report(
        &self,
        transaction_id: &str,
        status: TaskStatus,
    ) -> Result<(), ReportError> {
        let report = self.task_report(transaction_id, status);
        let url = report.callback_url(&self.origin)?;

        let mut req = self.client.post(url).headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req.send().await.map_err(|e| ReportError::Http {
            context: CONTEXT,
            source: e,
        })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ReportError::HttpStatus {
                context: CONTEXT,
                status,
            })
        }
    }
}
