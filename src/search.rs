//! Query facade.
//!
//! [`SearchClient`] is the single entry point for callers: a query string in,
//! typed records or one descriptive error out. Each non-empty query runs in a
//! fresh tool process; nothing is cached or retried.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::SearchConfig;
use crate::models::search_result::SearchResult;
use crate::tool::runner::{run_session, SessionConfig};
use crate::Result;

/// Runs search queries against the configured tool.
#[derive(Debug, Clone)]
pub struct SearchClient {
    session: SessionConfig,
}

impl SearchClient {
    /// Client for a validated configuration.
    #[must_use]
    pub fn new(config: &SearchConfig) -> Self {
        Self::from_session_config(config.session_config())
    }

    /// Client with explicit session settings.
    #[must_use]
    pub fn from_session_config(session: SessionConfig) -> Self {
        Self { session }
    }

    /// Session settings used for every query.
    #[must_use]
    pub fn session_config(&self) -> &SessionConfig {
        &self.session
    }

    /// Search for `query`.
    ///
    /// An empty or whitespace-only query returns an empty list without
    /// starting the tool.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying session; see
    /// [`run_session`](crate::tool::runner::run_session).
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        self.search_with_cancel(query, CancellationToken::new())
            .await
    }

    /// Search for `query`, abandoning the tool process when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`SearchClient::search`], plus
    /// [`AppError::Cancelled`](crate::AppError::Cancelled).
    pub async fn search_with_cancel(
        &self,
        query: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            debug!("empty query, skipping search");
            return Ok(Vec::new());
        }
        run_session(&self.session, query, cancel).await
    }
}
