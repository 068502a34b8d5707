//! Search session state machine.
//!
//! A [`Session`] tracks one query's conversation with the search tool:
//!
//! ```text
//! Spawned ──start()──▶ Initializing ──id 1 result──▶ ToolCalling ──id 2 result──▶ Settled
//!                          │                             │
//!                          └──── error / exit / deadline / write failure / cancel ──▶ Settled
//! ```
//!
//! The machine owns no I/O. Every input returns the [`Effect`]s the caller
//! must carry out, in order: messages to write to the tool's stdin, and at
//! most one [`Effect::Settle`] carrying the final outcome. All terminal
//! transitions go through a single settle step that fires once; after it,
//! every input returns no effects.

use std::time::Duration;

use tracing::debug;

use crate::models::search_result::SearchResult;
use crate::tool::content::{extract_tool_text, parse_search_results};
use crate::tool::message::{InboundMessage, OutboundMessage, INITIALIZE_ID, SEARCH_CALL_ID};
use crate::{AppError, Result};

/// Lifecycle phase of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Process started; nothing written yet.
    Spawned,
    /// `initialize` sent; waiting for the id 1 result.
    Initializing,
    /// `tools/call` sent; waiting for the id 2 response.
    ToolCalling,
    /// Outcome decided. Terminal.
    Settled,
}

/// Action requested by the state machine.
#[derive(Debug)]
pub enum Effect {
    /// Write this message to the tool's stdin.
    Send(OutboundMessage),
    /// The session is over: terminate the process and report this outcome.
    Settle(Result<Vec<SearchResult>>),
}

/// State machine for a single search query.
#[derive(Debug)]
pub struct Session {
    query: String,
    client_name: String,
    client_version: String,
    timeout: Duration,
    phase: Phase,
}

impl Session {
    /// Create a session for `query`. `timeout` is reported in the
    /// [`AppError::Timeout`] raised by [`Session::on_deadline`].
    #[must_use]
    pub fn new(query: &str, client_name: &str, client_version: &str, timeout: Duration) -> Self {
        Self {
            query: query.to_owned(),
            client_name: client_name.to_owned(),
            client_version: client_version.to_owned(),
            timeout,
            phase: Phase::Spawned,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the outcome has been decided.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    /// Open the conversation by sending `initialize`.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase != Phase::Spawned {
            return Vec::new();
        }
        self.phase = Phase::Initializing;
        vec![Effect::Send(OutboundMessage::initialize(
            &self.client_name,
            &self.client_version,
        ))]
    }

    /// Feed one line of tool stdout. Unparseable lines are ignored.
    pub fn on_line(&mut self, line: &str) -> Vec<Effect> {
        if self.is_settled() {
            return Vec::new();
        }
        match InboundMessage::decode(line) {
            Some(message) => self.on_message(message),
            None => Vec::new(),
        }
    }

    /// Feed one decoded message.
    pub fn on_message(&mut self, message: InboundMessage) -> Vec<Effect> {
        match (self.phase, message) {
            (Phase::Settled, _) => Vec::new(),

            (_, InboundMessage::ErrorResponse { id, error }) => {
                debug!(?id, code = error.code, "tool returned an error response");
                let message = if error.message.trim().is_empty() {
                    format!("search tool returned error code {}", error.code)
                } else {
                    error.message
                };
                self.settle(Err(AppError::Protocol(message)))
            }

            (Phase::Initializing, InboundMessage::Response { id, .. }) if id == INITIALIZE_ID => {
                debug!("initialize acknowledged, calling search tool");
                self.phase = Phase::ToolCalling;
                vec![
                    Effect::Send(OutboundMessage::initialized()),
                    Effect::Send(OutboundMessage::search_call(&self.query)),
                ]
            }

            (Phase::ToolCalling, InboundMessage::Response { id, result }) if id == SEARCH_CALL_ID => {
                let outcome = extract_tool_text(&result).map(|text| parse_search_results(&text));
                self.settle(outcome)
            }

            (phase, other) => {
                debug!(?phase, id = ?other.id(), "ignoring unrelated tool message");
                Vec::new()
            }
        }
    }

    /// The process exited and its output streams are drained.
    ///
    /// `exit_code` is `None` when the process was killed by a signal.
    pub fn on_exit(&mut self, exit_code: Option<i32>, diagnostics: &str) -> Vec<Effect> {
        let diagnostics = match (exit_code, diagnostics.trim()) {
            (Some(0), "") => "tool exited before responding".to_owned(),
            (_, text) => text.to_owned(),
        };
        self.settle(Err(AppError::ProcessFailure {
            exit_code,
            diagnostics,
        }))
    }

    /// The response deadline elapsed.
    pub fn on_deadline(&mut self) -> Vec<Effect> {
        self.settle(Err(AppError::Timeout(self.timeout)))
    }

    /// Writing to the tool's stdin failed; the process is unusable.
    pub fn on_write_failed(&mut self, err: &AppError) -> Vec<Effect> {
        self.settle(Err(AppError::Spawn(format!(
            "tool process unusable, write failed: {err}"
        ))))
    }

    /// The caller lost interest in the query.
    pub fn on_cancel(&mut self) -> Vec<Effect> {
        self.settle(Err(AppError::Cancelled))
    }

    /// The one terminal transition. Returns the settle effect the first time
    /// and nothing afterwards.
    fn settle(&mut self, outcome: Result<Vec<SearchResult>>) -> Vec<Effect> {
        if self.is_settled() {
            return Vec::new();
        }
        self.phase = Phase::Settled;
        vec![Effect::Settle(outcome)]
    }
}
