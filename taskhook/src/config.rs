//! Process-wide service configuration.
//!
//! Read once at startup from environment variables. Secrets may also be
//! supplied as files, see [`crate::secrets`].
//!
//! # Environment Variables
//!
//! - `SCHEDULER_NAME` — Scheduler host (`scheduler:8080`) or origin (`https://scheduler`).
//!   Bare hosts are reached over `http`.
//! - `SERVICE_NAME` — This service's identity, used in scheduler callbacks
//! - `INTERNAL_API_SECRET` — Shared bearer secret (or `INTERNAL_API_SECRET_FILE`)
//! - `SHUTDOWN_GRACE_PERIOD_MS` — Drain grace period in milliseconds (default: `5000`)
//! - `HOST` / `PORT` — Bind address of the HTTP listener, see [`BindArgs`]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::secrets::SecretFiles;

/// Default drain grace period in milliseconds.
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 5000;

/// Configuration shared by the shutdown coordinator and the scheduler reporter.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Origin of the scheduler service, e.g. `http://scheduler`.
    pub scheduler_origin: Url,

    /// Name this service reports itself as.
    pub service_name: String,

    /// Shared secret for the internal API.
    pub internal_api_secret: String,

    /// How long a shutdown may spend draining before it is forced.
    pub grace_period: Duration,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("scheduler_origin", &self.scheduler_origin.as_str())
            .field("service_name", &self.service_name)
            .field("internal_api_secret", &"<redacted>")
            .field("grace_period", &self.grace_period)
            .finish()
    }
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    ///
    /// Variables set directly take precedence over `<NAME>_FILE` secrets, so
    /// an explicit override in the environment is never shadowed by a mounted
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing, a value
    /// does not parse, or a secret file cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secrets = SecretFiles::from_env()?;
        Self::from_lookup(|name| {
            std::env::var(name)
                .ok()
                .or_else(|| secrets.get(name).map(str::to_owned))
        })
    }

    /// Builds the configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or a value
    /// does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing { name })
        };

        let scheduler_origin = parse_origin(&required("SCHEDULER_NAME")?)?;
        let service_name = required("SERVICE_NAME")?;
        let internal_api_secret = required("INTERNAL_API_SECRET")?;

        let grace_period = match lookup("SHUTDOWN_GRACE_PERIOD_MS") {
            Some(raw) => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::Invalid {
                        name: "SHUTDOWN_GRACE_PERIOD_MS",
                        reason: e.to_string(),
                    })?;
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_GRACE_PERIOD_MS),
        };

        Ok(Self {
            scheduler_origin,
            service_name,
            internal_api_secret,
            grace_period,
        })
    }
}

/// Parses `SCHEDULER_NAME`, defaulting to `http` when no scheme is given.
fn parse_origin(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") {
        raw.to_owned()
    } else {
        format!("http://{raw}")
    };

    let url = Url::parse(&with_scheme).map_err(|e| ConfigError::Invalid {
        name: "SCHEDULER_NAME",
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || url.host().is_none() {
        return Err(ConfigError::Invalid {
            name: "SCHEDULER_NAME",
            reason: format!("`{raw}` has no host"),
        });
    }
    Ok(url)
}

/// Bind address of the service's HTTP listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::Parser))]
#[cfg_attr(feature = "cli", command(version, about))]
pub struct BindArgs {
    /// Address to bind.
    #[cfg_attr(feature = "cli", arg(long, env = "HOST", default_value_t = default_host()))]
    pub host: IpAddr,

    /// Port to bind.
    #[cfg_attr(feature = "cli", arg(long, env = "PORT", default_value_t = default_port()))]
    pub port: u16,
}

impl Default for BindArgs {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl BindArgs {
    /// Socket address to bind the listener to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("SCHEDULER_NAME", "scheduler"),
        ("SERVICE_NAME", "service_name"),
        ("INTERNAL_API_SECRET", "a-secret-string"),
    ];

    #[test]
    fn test_reads_required_variables() {
        let config = ServiceConfig::from_lookup(lookup_from(BASE)).unwrap();

        assert_eq!(config.scheduler_origin.as_str(), "http://scheduler/");
        assert_eq!(config.service_name, "service_name");
        assert_eq!(config.internal_api_secret, "a-secret-string");
        assert_eq!(config.grace_period, Duration::from_millis(5000));
    }

    #[test]
    fn test_scheduler_with_scheme_and_port() {
        let mut vars = BASE.to_vec();
        vars[0] = ("SCHEDULER_NAME", "https://scheduler.internal:9443");
        let config = ServiceConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.scheduler_origin.scheme(), "https");
        assert_eq!(config.scheduler_origin.port(), Some(9443));
    }

    #[test]
    fn test_custom_grace_period() {
        let mut vars = BASE.to_vec();
        vars.push(("SHUTDOWN_GRACE_PERIOD_MS", "1500"));
        let config = ServiceConfig::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.grace_period, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_grace_period() {
        let mut vars = BASE.to_vec();
        vars.push(("SHUTDOWN_GRACE_PERIOD_MS", "soon"));
        let err = ServiceConfig::from_lookup(lookup_from(&vars)).unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SHUTDOWN_GRACE_PERIOD_MS",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_and_empty_variables() {
        let err = ServiceConfig::from_lookup(lookup_from(&BASE[..2])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "INTERNAL_API_SECRET"
            }
        ));

        let mut vars = BASE.to_vec();
        vars[1] = ("SERVICE_NAME", "  ");
        let err = ServiceConfig::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing {
                name: "SERVICE_NAME"
            }
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ServiceConfig::from_lookup(lookup_from(BASE)).unwrap();
        let rendered = format!("{config:?}");

        assert!(!rendered.contains("a-secret-string"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_default_bind_address() {
        let args = BindArgs::default();
        assert_eq!(args.socket_addr().to_string(), "0.0.0.0:8080");
    }
}
