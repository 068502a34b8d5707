//! Search tool payload parsing.
//!
//! The search tool answers `tools/call` with a text payload made of record
//! blocks. There is no schema; the layout below is the contract:
//!
//! ```text
//! ## <title>
//! - URL: <url>
//! - Repository: <owner/name>
//! - Type: <issue | pull_request | discussion>
//! - State: <open | closed | merged>
//! - Author: <login>
//! - Created at: <timestamp>
//! ---
//! ## <next title>
//! ...
//! ```
//!
//! Grammar, applied line by line:
//!
//! - a line equal to `---` (ignoring surrounding whitespace) ends a block;
//! - the first line in a block starting with `## ` is its heading; lines
//!   before it (a preamble such as "Found 2 results") are skipped, and a later
//!   `## ` line in the same block does not replace it;
//! - `- <Label>: <value>` sets a field when `Label` is one of the labels
//!   above (case-sensitive); the first occurrence wins;
//! - every other line is ignored.
//!
//! A block becomes a [`SearchResult`] only when both its title and URL are
//! non-empty. At most [`MAX_RESULTS`] records are returned, in payload order.

use serde_json::Value;
use tracing::debug;

use crate::models::search_result::{ResultKind, ResultState, SearchResult};
use crate::{AppError, Result};

/// Maximum number of records returned from one payload.
pub const MAX_RESULTS: usize = 20;

const BLOCK_SEPARATOR: &str = "---";
const HEADING_PREFIX: &str = "## ";
const FIELD_PREFIX: &str = "- ";

/// Parse a search payload into at most [`MAX_RESULTS`] records.
///
/// Malformed blocks are dropped individually; this function never fails.
#[must_use]
pub fn parse_search_results(text: &str) -> Vec<SearchResult> {
    let mut results = Vec::new();
    let mut block = BlockBuilder::default();

    for line in text.lines() {
        if results.len() >= MAX_RESULTS {
            break;
        }
        if line.trim() == BLOCK_SEPARATOR {
            if let Some(result) = std::mem::take(&mut block).finish() {
                results.push(result);
            }
            continue;
        }
        block.feed(line);
    }

    if results.len() < MAX_RESULTS {
        if let Some(result) = block.finish() {
            results.push(result);
        }
    }

    results
}

/// Extract the text payload from a `tools/call` result.
///
/// Reads `result.content[0].text`. A result flagged with `isError: true`
/// carries the tool's error message in that text.
///
/// # Errors
///
/// - [`AppError::Protocol`]: the result is flagged `isError`.
/// - [`AppError::Parse`]: the result has no text content.
pub fn extract_tool_text(result: &Value) -> Result<String> {
    let text = result
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
        .and_then(|item| item.get("text"))
        .and_then(Value::as_str);

    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    match (text, is_error) {
        (Some(text), true) if !text.trim().is_empty() => Err(AppError::Protocol(text.to_owned())),
        (_, true) => Err(AppError::Protocol("search tool reported an error".into())),
        (Some(text), false) => Ok(text.to_owned()),
        (None, false) => Err(AppError::Parse(
            "tool result has no text content at content[0].text".into(),
        )),
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Known field labels.
#[derive(Debug, Clone, Copy)]
enum Label {
    Url,
    Repository,
    Type,
    State,
    Author,
    CreatedAt,
}

impl Label {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "URL" => Some(Self::Url),
            "Repository" => Some(Self::Repository),
            "Type" => Some(Self::Type),
            "State" => Some(Self::State),
            "Author" => Some(Self::Author),
            "Created at" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

/// Fields collected for the block currently being scanned.
#[derive(Debug, Default)]
struct BlockBuilder {
    title: Option<String>,
    url: Option<String>,
    repository: Option<String>,
    kind: Option<String>,
    state: Option<String>,
    author: Option<String>,
    created_at: Option<String>,
}

impl BlockBuilder {
    fn feed(&mut self, line: &str) {
        let line = line.trim_end();

        if let Some(title) = line.strip_prefix(HEADING_PREFIX) {
            self.title.get_or_insert_with(|| title.trim().to_owned());
            return;
        }

        let Some((label, value)) = line
            .strip_prefix(FIELD_PREFIX)
            .and_then(|field| field.split_once(':'))
        else {
            return;
        };
        let Some(label) = Label::parse(label.trim()) else {
            return;
        };

        let slot = match label {
            Label::Url => &mut self.url,
            Label::Repository => &mut self.repository,
            Label::Type => &mut self.kind,
            Label::State => &mut self.state,
            Label::Author => &mut self.author,
            Label::CreatedAt => &mut self.created_at,
        };
        slot.get_or_insert_with(|| value.trim().to_owned());
    }

    fn finish(self) -> Option<SearchResult> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let Some(url) = self.url.filter(|u| !u.is_empty()) else {
            debug!(title = %title, "search payload: block without url dropped");
            return None;
        };

        // Defaults may hide a malformed block; surfaced at DEBUG only.
        let kind = match self.kind.filter(|k| !k.is_empty()) {
            Some(kind) => ResultKind::from(kind),
            None => {
                debug!(url = %url, "search payload: missing type, defaulting to issue");
                ResultKind::default()
            }
        };
        let state = match self.state.filter(|s| !s.is_empty()) {
            Some(state) => ResultState::from(state),
            None => {
                debug!(url = %url, "search payload: missing state, defaulting to open");
                ResultState::default()
            }
        };

        Some(SearchResult {
            title,
            url,
            repository: self.repository.unwrap_or_default(),
            kind,
            state,
            author: self.author.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_default(),
        })
    }
}
