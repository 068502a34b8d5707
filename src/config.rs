//! Search client configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::tool::runner::SessionConfig;
use crate::tool::spawner::SpawnConfig;
use crate::{AppError, Result};

fn default_timeout_seconds() -> u64 {
    10
}

fn default_client_name() -> String {
    env!("CARGO_PKG_NAME").into()
}

/// Client configuration parsed from `config.toml`.
///
/// ```toml
/// executable = "~/.local/bin/issue-index"
/// home_dir = "~/.issue-index"
/// timeout_seconds = 10
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    /// Search tool executable. A leading `~` is expanded.
    pub executable: PathBuf,
    /// Optional tool data directory, passed as `-m <dir>`.
    #[serde(default)]
    pub home_dir: Option<PathBuf>,
    /// Response deadline for each query.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Name announced in `clientInfo`.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

impl SearchConfig {
    /// Configuration with defaults for everything but the executable.
    ///
    /// The result is not validated; call [`SearchConfig::validate`] before use
    /// when the executable comes from user input.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            home_dir: None,
            timeout_seconds: default_timeout_seconds(),
            client_name: default_client_name(),
        }
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants and normalize paths in place.
    ///
    /// Expands `~` in both paths, requires `home_dir` to be an existing
    /// directory (and canonicalizes it), and rejects a zero timeout.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` describing the first violation.
    pub fn validate(&mut self) -> Result<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(AppError::Config("executable must not be empty".into()));
        }
        self.executable = expand_tilde(&self.executable);

        if self.timeout_seconds == 0 {
            return Err(AppError::Config(
                "timeout_seconds must be greater than zero".into(),
            ));
        }

        if self.client_name.trim().is_empty() {
            return Err(AppError::Config("client_name must not be empty".into()));
        }

        if let Some(home) = self.home_dir.take() {
            let expanded = expand_tilde(&home);
            if !expanded.is_dir() {
                return Err(AppError::Config(format!(
                    "home_dir is not a directory: {}",
                    expanded.display()
                )));
            }
            let canonical = expanded
                .canonicalize()
                .map_err(|err| AppError::Config(format!("home_dir invalid: {err}")))?;
            self.home_dir = Some(canonical);
        }

        Ok(())
    }

    /// Response deadline as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Process launch settings.
    #[must_use]
    pub fn spawn_config(&self) -> SpawnConfig {
        SpawnConfig {
            executable: self.executable.clone(),
            home_dir: self.home_dir.clone(),
        }
    }

    /// Per-query session settings.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            timeout: self.timeout(),
            client_name: self.client_name.clone(),
            ..SessionConfig::new(self.spawn_config())
        }
    }
}

/// Expand a leading `~` component to the current user's home directory.
///
/// `~user` forms and paths without a leading `~` are returned unchanged, as
/// is everything when the home directory cannot be determined.
#[must_use]
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
