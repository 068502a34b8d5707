//! Search tool process spawner.
//!
//! Launches `<executable> mcp [-m <home_dir>]` with all three stdio streams
//! piped and:
//! - `kill_on_drop(true)`, so a dropped session never leaks the process;
//! - the caller's environment, with `PATH` extended by
//!   [`FALLBACK_PATH_DIRS`] so tools installed in the usual locations can
//!   find their own helpers even when launched from a minimal environment.
//!
//! The returned [`ToolProcess`] sends at most one termination request over
//! its lifetime.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::{AppError, Result};

/// Directories guaranteed to be on the child's `PATH`, appended after the
/// inherited entries when missing.
pub const FALLBACK_PATH_DIRS: &[&str] = &["/usr/local/bin", "/opt/homebrew/bin", "/usr/bin", "/bin"];

/// Sub-command that puts the tool into MCP server mode.
pub const MCP_SUBCOMMAND: &str = "mcp";

/// How long a terminated process may take to exit before it is killed.
pub const TERMINATION_GRACE: Duration = Duration::from_secs(5);

// ── Configuration ────────────────────────────────────────────────────────────

/// Configuration for spawning the search tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnConfig {
    /// Tool executable, already tilde-expanded.
    pub executable: PathBuf,
    /// Optional data home passed as `-m <dir>`.
    pub home_dir: Option<PathBuf>,
}

impl SpawnConfig {
    /// Command-line arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from(MCP_SUBCOMMAND)];
        if let Some(home) = &self.home_dir {
            args.push(OsString::from("-m"));
            args.push(home.clone().into_os_string());
        }
        args
    }
}

// ── Process handle ───────────────────────────────────────────────────────────

/// Owned handle to a running search tool process.
#[derive(Debug)]
pub struct ToolProcess {
    child: Child,
    terminated: bool,
}

impl ToolProcess {
    /// OS process id, while the process has not been reaped.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether a termination request has already been sent.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Ask the process to exit.
    ///
    /// Sends `SIGTERM` on unix and a hard kill elsewhere. Only the first call
    /// signals the process; it returns `true`, every later call returns
    /// `false` and does nothing.
    pub fn terminate(&mut self) -> bool {
        if self.terminated {
            return false;
        }
        self.terminated = true;

        match send_termination(&mut self.child) {
            Ok(()) => debug!(pid = ?self.child.id(), "termination requested"),
            Err(err) => warn!(%err, "failed to signal tool process"),
        }
        true
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] if waiting on the child fails.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child
            .wait()
            .await
            .map_err(|err| AppError::Io(format!("failed to wait for tool process: {err}")))
    }

    /// Hand the process to a background task that waits up to `grace` for
    /// it to exit, then drops it.
    ///
    /// Dropping a child that ignored the termination request sends `SIGKILL`
    /// through `kill_on_drop`. This runs after the session has settled and
    /// only guards against a leaked process; [`ToolProcess::terminate`] stays
    /// the single termination request issued by the session.
    pub fn reap(mut self, grace: Duration) {
        tokio::spawn(async move {
            match tokio::time::timeout(grace, self.child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "tool process reaped"),
                Ok(Err(err)) => warn!(%err, "error waiting for tool process"),
                Err(_elapsed) => {
                    warn!(?grace, "tool process still running after termination, killing");
                }
            }
        });
    }
}

/// Stdio connection to a freshly spawned search tool.
#[derive(Debug)]
pub struct ToolConnection {
    /// Process handle.
    pub process: ToolProcess,
    /// Tool stdin, for outbound messages.
    pub stdin: ChildStdin,
    /// Tool stdout, carrying NDJSON messages.
    pub stdout: ChildStdout,
    /// Tool stderr, captured for diagnostics only.
    pub stderr: ChildStderr,
}

// ── Spawner ──────────────────────────────────────────────────────────────────

/// Spawn the search tool in MCP mode.
///
/// # Errors
///
/// - [`AppError::ExecutableNotFound`]: the executable path does not resolve.
/// - [`AppError::Spawn`]: any other spawn failure, or a stdio pipe could not
///   be captured.
pub fn spawn_tool(config: &SpawnConfig) -> Result<ToolConnection> {
    let mut cmd = Command::new(&config.executable);
    cmd.args(config.args())
        .env("PATH", augmented_path(std::env::var_os("PATH").as_deref()))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|err| map_spawn_error(&config.executable, &err))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture tool stdin".into()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture tool stdout".into()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Spawn("failed to capture tool stderr".into()))?;

    info!(
        executable = %config.executable.display(),
        pid = ?child.id(),
        "search tool spawned"
    );

    Ok(ToolConnection {
        process: ToolProcess {
            child,
            terminated: false,
        },
        stdin,
        stdout,
        stderr,
    })
}

/// Build the child's `PATH`: the inherited entries, then every entry of
/// [`FALLBACK_PATH_DIRS`] not already present.
#[must_use]
pub fn augmented_path(inherited: Option<&OsStr>) -> OsString {
    let mut dirs: Vec<PathBuf> = inherited
        .map(|raw| std::env::split_paths(raw).collect())
        .unwrap_or_default();

    for fallback in FALLBACK_PATH_DIRS {
        let fallback = Path::new(fallback);
        if !dirs.iter().any(|dir| dir == fallback) {
            dirs.push(fallback.to_path_buf());
        }
    }

    // join_paths only fails on entries containing the separator; those came
    // from the inherited value, which is then passed through untouched.
    std::env::join_paths(&dirs).unwrap_or_else(|_| inherited.unwrap_or_default().to_os_string())
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn map_spawn_error(executable: &Path, err: &io::Error) -> AppError {
    if err.kind() == io::ErrorKind::NotFound {
        AppError::ExecutableNotFound(executable.display().to_string())
    } else {
        AppError::Spawn(format!(
            "failed to spawn {}: {err}",
            executable.display()
        ))
    }
}

#[cfg(unix)]
fn send_termination(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // No pid means the process was already reaped.
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_termination(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
