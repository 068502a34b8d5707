//! JSON-RPC message envelopes exchanged with the search tool.
//!
//! Outbound messages are built from typed constructors and serialized as a
//! single compact JSON line. Inbound lines are classified once, at the decode
//! boundary, into an [`InboundMessage`] variant; the session never inspects
//! raw JSON shapes itself.
//!
//! | Shape                               | Variant                           |
//! |-------------------------------------|-----------------------------------|
//! | `id` + `error`                      | [`InboundMessage::ErrorResponse`] |
//! | `error` without `id`                | [`InboundMessage::ErrorResponse`] |
//! | `id` + `result`                     | [`InboundMessage::Response`]      |
//! | `id` + `method`                     | [`InboundMessage::Request`]       |
//! | `method` without `id`               | [`InboundMessage::Notification`]  |
//! | *(anything else, or not JSON)*      | Skipped; logged at `DEBUG`        |

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

/// JSON-RPC protocol version string carried on every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision announced in the `initialize` request.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Correlation id of the `initialize` request.
pub const INITIALIZE_ID: i64 = 1;

/// Correlation id of the `tools/call` search request.
pub const SEARCH_CALL_ID: i64 = 2;

/// Name of the tool invoked through `tools/call`.
pub const SEARCH_TOOL_NAME: &str = "search";

/// Fields requested from the search tool; the content parser reads exactly
/// these.
pub const SEARCH_FIELDS: &[&str] = &[
    "title",
    "url",
    "repository",
    "created_at",
    "author",
    "type",
    "state",
];

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Message written to the tool's stdin.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// A request expecting a response with the same `id`.
    Request {
        /// Correlation id.
        id: i64,
        /// Method name.
        method: String,
        /// Method parameters.
        params: Value,
    },
    /// A fire-and-forget notification.
    Notification {
        /// Method name.
        method: String,
        /// Method parameters.
        params: Value,
    },
}

impl OutboundMessage {
    /// The `initialize` request that opens every session.
    #[must_use]
    pub fn initialize(client_name: &str, client_version: &str) -> Self {
        Self::Request {
            id: INITIALIZE_ID,
            method: "initialize".into(),
            params: json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "clientInfo": { "name": client_name, "version": client_version },
                "capabilities": {}
            }),
        }
    }

    /// The `notifications/initialized` notification sent after the
    /// `initialize` response.
    #[must_use]
    pub fn initialized() -> Self {
        Self::Notification {
            method: "notifications/initialized".into(),
            params: json!({}),
        }
    }

    /// The `tools/call` request running a search for `query`.
    #[must_use]
    pub fn search_call(query: &str) -> Self {
        Self::Request {
            id: SEARCH_CALL_ID,
            method: "tools/call".into(),
            params: json!({
                "name": SEARCH_TOOL_NAME,
                "arguments": { "query": query, "fields": SEARCH_FIELDS }
            }),
        }
    }

    /// Method name of the message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request { method, .. } | Self::Notification { method, .. } => method,
        }
    }

    /// Correlation id, for requests.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Request { id, .. } => Some(*id),
            Self::Notification { .. } => None,
        }
    }

    /// Full JSON-RPC object for the message.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Request { id, method, params } => json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": id,
                "method": method,
                "params": params
            }),
            Self::Notification { method, params } => json!({
                "jsonrpc": JSONRPC_VERSION,
                "method": method,
                "params": params
            }),
        }
    }

    /// Compact single-line JSON encoding, without the trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        self.to_value().to_string()
    }
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// JSON-RPC `error` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message; may be empty.
    pub message: String,
}

/// One decoded line from the tool's stdout.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Server-initiated request.
    Request {
        /// Correlation id.
        id: i64,
        /// Method name.
        method: String,
        /// Method parameters (`null` when absent).
        params: Value,
    },
    /// Server-initiated notification.
    Notification {
        /// Method name.
        method: String,
        /// Method parameters (`null` when absent).
        params: Value,
    },
    /// Successful response.
    Response {
        /// Correlation id of the answered request.
        id: i64,
        /// Result payload.
        result: Value,
    },
    /// Error response. The id may be missing when the server could not read
    /// the request's id.
    ErrorResponse {
        /// Correlation id, when present.
        id: Option<i64>,
        /// Error payload.
        error: RpcError,
    },
}

impl InboundMessage {
    /// Classify one line of tool output.
    ///
    /// Returns `None` for blank lines, lines that are not JSON objects, and
    /// objects matching none of the known shapes. Such lines are protocol
    /// noise and never fatal.
    #[must_use]
    pub fn decode(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        let object = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(object)) => object,
            Ok(_) => {
                debug!(raw = trimmed, "tool message: not a json object, skipping");
                return None;
            }
            Err(err) => {
                debug!(error = %err, raw = trimmed, "tool message: non-json line, skipping");
                return None;
            }
        };

        let message = classify(object);
        if message.is_none() {
            debug!(raw = trimmed, "tool message: unrecognised envelope, skipping");
        }
        message
    }

    /// Correlation id, when the message carries one.
    #[must_use]
    pub fn id(&self) -> Option<i64> {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } => Some(*id),
            Self::ErrorResponse { id, .. } => *id,
            Self::Notification { .. } => None,
        }
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn classify(mut object: Map<String, Value>) -> Option<InboundMessage> {
    let id = object.get("id").and_then(parse_id);

    if let Some(error) = object.remove("error").filter(|e| !e.is_null()) {
        return Some(InboundMessage::ErrorResponse {
            id,
            error: parse_error(error),
        });
    }

    if let Some(id) = id {
        if let Some(result) = object.remove("result") {
            return Some(InboundMessage::Response { id, result });
        }
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) => method,
        _ => return None,
    };
    let params = object.remove("params").unwrap_or(Value::Null);

    Some(match id {
        Some(id) => InboundMessage::Request { id, method, params },
        None => InboundMessage::Notification { method, params },
    })
}

fn parse_id(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn parse_error(raw: Value) -> RpcError {
    match raw {
        Value::String(message) => RpcError { code: 0, message },
        other => serde_json::from_value(other.clone()).unwrap_or_else(|_| RpcError {
            code: 0,
            message: other.to_string(),
        }),
    }
}
