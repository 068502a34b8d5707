//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all search failure modes.
///
/// Every variant renders as a single human-readable line; the presentation
/// layer shows the message text and does not branch on the kind.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The configured tool executable does not resolve to a file.
    ExecutableNotFound(String),
    /// Spawning the tool process, or writing to its stdin, failed.
    Spawn(String),
    /// The tool answered with a JSON-RPC `error` payload.
    Protocol(String),
    /// No settled response within the configured deadline.
    Timeout(Duration),
    /// The tool process exited without producing a result.
    ProcessFailure {
        /// Exit code, or `None` when the process was terminated by a signal.
        exit_code: Option<i32>,
        /// Text captured from the process's stderr.
        diagnostics: String,
    },
    /// A response arrived but its payload could not be interpreted.
    Parse(String),
    /// The caller cancelled the query before it settled.
    Cancelled,
    /// File-system or stream I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::ExecutableNotFound(path) => write!(f, "executable not found: {path}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Timeout(after) => {
                write!(f, "timeout: no response within {}s", after.as_secs_f64())
            }
            Self::ProcessFailure {
                exit_code,
                diagnostics,
            } => {
                match exit_code {
                    Some(code) => write!(f, "process failure: exited with code {code}")?,
                    None => write!(f, "process failure: terminated by signal")?,
                }
                let diagnostics = diagnostics.trim();
                if !diagnostics.is_empty() {
                    write!(f, ": {diagnostics}")?;
                }
                Ok(())
            }
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Cancelled => write!(f, "cancelled: query superseded"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
