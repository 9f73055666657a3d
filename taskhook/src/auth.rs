//! Bearer credentials for the internal service API.
//!
//! Services and the scheduler authenticate to each other with a single
//! shared secret sent as `authorization: bearer <secret>`.

use http::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};

const BEARER_PREFIX: &str = "bearer ";

/// Builds the `authorization` header value for `secret`.
///
/// # Errors
///
/// Returns [`InvalidHeaderValue`] if the secret contains characters that are
/// not allowed in a header.
pub fn bearer_value(secret: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{secret}"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Builds a header map carrying only the bearer credential.
///
/// # Errors
///
/// Returns [`InvalidHeaderValue`] if the secret is not a valid header value.
pub fn auth_headers(secret: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::with_capacity(1);
    headers.insert(AUTHORIZATION, bearer_value(secret)?);
    Ok(headers)
}

/// Checks whether a request carries the shared bearer secret.
///
/// An empty `secret` rejects every request.
#[must_use]
pub fn is_authenticated(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    if !value.starts_with("bearer") {
        return false;
    }

    if secret.is_empty() {
        #[cfg(feature = "telemetry")]
        tracing::error!("The secret for internal API authentication is not set");
        return false;
    }

    value
        .get(BEARER_PREFIX.len()..)
        .is_some_and(|token| token == secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_authorization(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_header() {
        let headers = auth_headers("a-secret-string").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[AUTHORIZATION], "bearer a-secret-string");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_rejects_invalid_header_secret() {
        assert!(bearer_value("line\nbreak").is_err());
    }

    #[test]
    fn test_accepts_matching_secret() {
        let headers = with_authorization("bearer a-secret-string");
        assert!(is_authenticated(&headers, "a-secret-string"));
    }

    #[test]
    fn test_rejects_wrong_or_missing_credentials() {
        assert!(!is_authenticated(&HeaderMap::new(), "a-secret-string"));
        assert!(!is_authenticated(
            &with_authorization("bearer other"),
            "a-secret-string"
        ));
        assert!(!is_authenticated(
            &with_authorization("basic a-secret-string"),
            "a-secret-string"
        ));
        assert!(!is_authenticated(&with_authorization("bearer"), "a-secret-string"));
    }

    #[test]
    fn test_empty_secret_rejects_everything() {
        assert!(!is_authenticated(&with_authorization("bearer "), ""));
    }
}
