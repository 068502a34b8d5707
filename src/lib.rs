#![forbid(unsafe_code)]

//! Client for a stdio MCP search tool.
//!
//! [`SearchClient`] turns a query into a list of typed [`SearchResult`]s by
//! driving a short-lived tool process through the `initialize` →
//! `tools/call` exchange implemented in [`tool`].

pub mod config;
pub mod errors;
pub mod models;
pub mod search;
pub mod tool;

pub use config::SearchConfig;
pub use errors::{AppError, Result};
pub use models::search_result::{ResultKind, ResultState, SearchResult};
pub use search::SearchClient;
