//! Search tool client.
//!
//! Talks newline-delimited JSON-RPC to a search tool process launched as
//! `<executable> mcp`. One process serves exactly one query:
//!
//! 1. `initialize` (id 1) → wait for its result;
//! 2. `notifications/initialized`, then `tools/call` (id 2) → wait for its
//!    response;
//! 3. parse the text payload into [`SearchResult`](crate::models::search_result::SearchResult)s
//!    and terminate the process.
//!
//! Submodules:
//! - `codec`: NDJSON line framing that tolerates invalid UTF-8.
//! - `message`: outbound constructors and the inbound envelope union.
//! - `content`: the record-block payload scanner.
//! - `spawner`: process launch, environment and termination.
//! - `session`: the I/O-free state machine.
//! - `runner`: the task driving a session over a live process.

pub mod codec;
pub mod content;
pub mod message;
pub mod runner;
pub mod session;
pub mod spawner;
