//! Search session runner.
//!
//! [`run_session`] owns one search tool process from spawn to termination.
//! A single task multiplexes every event source with `tokio::select!`:
//!
//! | Source                  | Session input                  |
//! |-------------------------|--------------------------------|
//! | cancellation token      | [`Session::on_cancel`]         |
//! | response deadline       | [`Session::on_deadline`]       |
//! | stdout line             | [`Session::on_line`]           |
//! | stderr chunk            | captured as diagnostics        |
//! | process exit            | [`Session::on_exit`] (deferred)|
//!
//! Exit is only reported once stdout and stderr are both drained, so a
//! response written just before the process exits (including an
//! unterminated final line) is still parsed through the normal path.
//!
//! Whatever settles the session, the process receives exactly one
//! termination request and is then reaped in the background.

use std::time::Duration;

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::process::ChildStdin;
use tokio::time::Instant;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::models::search_result::SearchResult;
use crate::tool::codec::ToolCodec;
use crate::tool::message::OutboundMessage;
use crate::tool::session::{Effect, Session};
use crate::tool::spawner::{spawn_tool, SpawnConfig, ToolConnection, TERMINATION_GRACE};
use crate::{AppError, Result};

/// Upper bound on captured stderr text.
pub const MAX_DIAGNOSTIC_BYTES: usize = 64 * 1024;

/// Default response deadline for a session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to run one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How to launch the tool.
    pub spawn: SpawnConfig,
    /// Deadline for the whole exchange, armed at spawn.
    pub timeout: Duration,
    /// `clientInfo.name` sent in `initialize`.
    pub client_name: String,
    /// `clientInfo.version` sent in `initialize`.
    pub client_version: String,
}

impl SessionConfig {
    /// Session configuration with the default timeout and client identity.
    #[must_use]
    pub fn new(spawn: SpawnConfig) -> Self {
        Self {
            spawn,
            timeout: DEFAULT_TIMEOUT,
            client_name: env!("CARGO_PKG_NAME").to_owned(),
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

type StdinSink = FramedWrite<ChildStdin, ToolCodec>;

/// Run one search query against a freshly spawned tool process.
///
/// # Errors
///
/// - [`AppError::ExecutableNotFound`] / [`AppError::Spawn`]: the process
///   could not be started or written to.
/// - [`AppError::Protocol`]: the tool answered with an `error`.
/// - [`AppError::Timeout`]: no outcome within `config.timeout`.
/// - [`AppError::ProcessFailure`]: the tool exited without a result.
/// - [`AppError::Parse`]: the search response had no text payload.
/// - [`AppError::Cancelled`]: `cancel` fired first.
pub async fn run_session(
    config: &SessionConfig,
    query: &str,
    cancel: CancellationToken,
) -> Result<Vec<SearchResult>> {
    let session_id = Uuid::new_v4();
    let span = info_span!("search_session", %session_id);
    drive(config, query, cancel).instrument(span).await
}

async fn drive(
    config: &SessionConfig,
    query: &str,
    cancel: CancellationToken,
) -> Result<Vec<SearchResult>> {
    let ToolConnection {
        mut process,
        stdin,
        stdout,
        stderr,
    } = spawn_tool(&config.spawn)?;

    let deadline = Instant::now() + config.timeout;
    let mut session = Session::new(
        query,
        &config.client_name,
        &config.client_version,
        config.timeout,
    );

    let mut sink: StdinSink = FramedWrite::new(stdin, ToolCodec::new());
    let mut lines = FramedRead::new(stdout, ToolCodec::new());
    let mut errors = FramedRead::new(stderr, BytesCodec::new());
    let mut diagnostics = Diagnostics::default();

    let mut stdout_open = true;
    let mut stderr_open = true;
    let mut exit: Option<Option<i32>> = None;

    let mut effects = session.start();

    let outcome = loop {
        if let Some(outcome) = apply(&mut session, &mut sink, effects, deadline).await {
            break outcome;
        }

        if let (false, false, Some(code)) = (stdout_open, stderr_open, exit) {
            effects = session.on_exit(code, diagnostics.text());
            continue;
        }

        effects = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("cancellation received");
                session.on_cancel()
            }

            () = tokio::time::sleep_until(deadline) => {
                warn!(timeout = ?config.timeout, "search tool did not respond in time");
                session.on_deadline()
            }

            frame = lines.next(), if stdout_open => match frame {
                Some(Ok(line)) => session.on_line(&line),
                Some(Err(err)) => {
                    warn!(error = %err, "stdout read failed");
                    stdout_open = false;
                    Vec::new()
                }
                None => {
                    debug!("stdout closed");
                    stdout_open = false;
                    Vec::new()
                }
            },

            chunk = errors.next(), if stderr_open => {
                match chunk {
                    Some(Ok(bytes)) => diagnostics.push(&bytes),
                    Some(Err(err)) => {
                        debug!(error = %err, "stderr read failed");
                        stderr_open = false;
                    }
                    None => stderr_open = false,
                }
                Vec::new()
            }

            status = process.wait(), if exit.is_none() => {
                let code = match status {
                    Ok(status) => status.code(),
                    Err(err) => {
                        warn!(error = %err, "error waiting for search tool");
                        None
                    }
                };
                debug!(exit_code = ?code, "search tool exited");
                exit = Some(code);
                Vec::new()
            }
        };
    };

    process.terminate();
    process.reap(TERMINATION_GRACE);

    match &outcome {
        Ok(results) => info!(results = results.len(), "search settled"),
        Err(err) => warn!(error = %err, "search failed"),
    }
    outcome
}

/// Carry out `effects` in order. Returns the outcome once one is settled.
async fn apply(
    session: &mut Session,
    sink: &mut StdinSink,
    effects: Vec<Effect>,
    deadline: Instant,
) -> Option<Result<Vec<SearchResult>>> {
    for effect in effects {
        match effect {
            Effect::Settle(outcome) => return Some(outcome),
            Effect::Send(message) => {
                let follow_up = match send(sink, &message, deadline).await {
                    Ok(()) => continue,
                    Err(WriteFailure::Deadline) => session.on_deadline(),
                    Err(WriteFailure::Io(err)) => session.on_write_failed(&err),
                };
                return follow_up.into_iter().find_map(|effect| match effect {
                    Effect::Settle(outcome) => Some(outcome),
                    Effect::Send(_) => None,
                });
            }
        }
    }
    None
}

enum WriteFailure {
    Deadline,
    Io(AppError),
}

async fn send(
    sink: &mut StdinSink,
    message: &OutboundMessage,
    deadline: Instant,
) -> std::result::Result<(), WriteFailure> {
    match tokio::time::timeout_at(deadline, sink.send(message.to_line())).await {
        Ok(Ok(())) => {
            debug!(method = message.method(), id = ?message.id(), "message sent");
            Ok(())
        }
        Ok(Err(err)) => {
            warn!(method = message.method(), error = %err, "write to search tool failed");
            Err(WriteFailure::Io(err))
        }
        Err(_elapsed) => Err(WriteFailure::Deadline),
    }
}

/// Stderr text captured for failure messages, capped at
/// [`MAX_DIAGNOSTIC_BYTES`].
#[derive(Debug, Default)]
struct Diagnostics {
    text: String,
}

impl Diagnostics {
    fn push(&mut self, chunk: &BytesMut) {
        if self.text.len() >= MAX_DIAGNOSTIC_BYTES {
            return;
        }
        self.text.push_str(&String::from_utf8_lossy(chunk));
        if self.text.len() > MAX_DIAGNOSTIC_BYTES {
            let mut cut = MAX_DIAGNOSTIC_BYTES;
            while !self.text.is_char_boundary(cut) {
                cut -= 1;
            }
            self.text.truncate(cut);
        }
    }

    fn text(&self) -> &str {
        &self.text
    }
}
