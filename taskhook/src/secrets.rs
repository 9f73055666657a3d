//! Docker-style secret files.
//!
//! Container runtimes mount secrets as files under `/run/secrets` and point
//! at them with `<NAME>_FILE` variables, e.g.
//! `INTERNAL_API_SECRET_FILE=/run/secrets/internal_api_secret`.
//! [`SecretFiles::collect`] reads every such file whose variable name ends in
//! `SECRET_FILE` (any case) and exposes the trimmed contents under `<NAME>`.
//! Files outside the secrets root, and paths climbing out of it with `..`,
//! are skipped.
//!
//! A variable set directly wins over its `<NAME>_FILE` counterpart, see
//! [`crate::config::ServiceConfig::from_env`].

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::error::ConfigError;

/// Directory secret files must live in.
pub const DEFAULT_SECRETS_ROOT: &str = "/run/secrets";

const FILE_SUFFIX: &str = "_FILE";

/// Secret values loaded from files, keyed by variable name without `_FILE`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretFiles {
    values: HashMap<String, String>,
}

impl SecretFiles {
    /// Loads secret files referenced by the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretFile`] if a referenced file cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::collect(utf8_vars(std::env::vars_os()), Path::new(DEFAULT_SECRETS_ROOT))
    }

    /// Loads secret files referenced by `vars`, accepting only paths under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SecretFile`] if a referenced file cannot be read.
    pub fn collect<I>(vars: I, root: &Path) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut values = HashMap::new();
        for (name, value) in vars {
            if !name.to_ascii_lowercase().ends_with("secret_file") {
                continue;
            }
            let secret_name = name[..name.len() - FILE_SUFFIX.len()].to_owned();

            let path = PathBuf::from(&value);
            if !is_under(&path, root) {
                #[cfg(feature = "telemetry")]
                tracing::warn!(
                    secret = %secret_name,
                    path = %path.display(),
                    "Ignoring secret variable with unexpected path"
                );
                continue;
            }

            let contents = std::fs::read_to_string(&path)
                .map_err(|source| ConfigError::SecretFile {
                    path: path.clone(),
                    source,
                })?;

            #[cfg(feature = "telemetry")]
            tracing::info!(secret = %secret_name, "Loaded secret from file");

            values.insert(secret_name, contents.trim().to_owned());
        }
        Ok(Self { values })
    }

    /// Returns the secret loaded for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of secrets loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no secret files were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Drops variables whose name or value is not valid UTF-8.
fn utf8_vars<I>(vars: I) -> impl Iterator<Item = (String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

fn is_under(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
        && !path
            .components()
            .any(|component| component == Component::ParentDir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("taskhook-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_reads_and_trims_secret_files() {
        let root = scratch_dir("secrets-read");
        let file = root.join("internal_api_secret");
        std::fs::write(&file, "  a-secret-string\n").unwrap();

        let vars = vec![
            (
                "INTERNAL_API_SECRET_FILE".to_owned(),
                file.display().to_string(),
            ),
            ("SERVICE_NAME".to_owned(), "snapshots".to_owned()),
        ];
        let secrets = SecretFiles::collect(vars, &root).unwrap();

        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets.get("INTERNAL_API_SECRET"), Some("a-secret-string"));
        assert_eq!(secrets.get("SERVICE_NAME"), None);
    }

    #[test]
    fn test_suffix_match_ignores_case() {
        let root = scratch_dir("secrets-case");
        let file = root.join("db");
        std::fs::write(&file, "hunter2").unwrap();

        let vars = vec![("db_secret_file".to_owned(), file.display().to_string())];
        let secrets = SecretFiles::collect(vars, &root).unwrap();

        assert_eq!(secrets.get("db_secret"), Some("hunter2"));
    }

    #[test]
    fn test_skips_paths_outside_root() {
        let root = scratch_dir("secrets-root");
        let outside = scratch_dir("secrets-outside").join("leak");
        std::fs::write(&outside, "nope").unwrap();

        let vars = vec![(
            "INTERNAL_API_SECRET_FILE".to_owned(),
            outside.display().to_string(),
        )];
        let secrets = SecretFiles::collect(vars, &root).unwrap();

        assert!(secrets.is_empty());
    }

    #[test]
    fn test_skips_parent_dir_escapes() {
        let root = scratch_dir("secrets-escape");
        let outside = scratch_dir("secrets-escape-target").join("leak");
        std::fs::write(&outside, "nope").unwrap();

        let escaping = root
            .join("..")
            .join(outside.parent().unwrap().file_name().unwrap())
            .join("leak");
        assert!(escaping.starts_with(&root));

        let vars = vec![(
            "INTERNAL_API_SECRET_FILE".to_owned(),
            escaping.display().to_string(),
        )];
        let secrets = SecretFiles::collect(vars, &root).unwrap();

        assert!(secrets.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_variables_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let vars = vec![
            (
                OsString::from("LC_GARBAGE"),
                OsString::from_vec(vec![0xff, 0xfe]),
            ),
            (
                OsString::from_vec(vec![b'X', 0xff]),
                OsString::from("value"),
            ),
            (
                OsString::from("SERVICE_NAME"),
                OsString::from("snapshots"),
            ),
        ];

        let kept: Vec<_> = utf8_vars(vars).collect();
        assert_eq!(
            kept,
            vec![("SERVICE_NAME".to_owned(), "snapshots".to_owned())]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let root = scratch_dir("secrets-missing");
        let vars = vec![(
            "INTERNAL_API_SECRET_FILE".to_owned(),
            root.join("absent").display().to_string(),
        )];

        let err = SecretFiles::collect(vars, &root).unwrap_err();
        assert!(matches!(err, ConfigError::SecretFile { .. }));
    }
}
