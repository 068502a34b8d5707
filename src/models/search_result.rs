//! Search result model.
//!
//! A [`SearchResult`] is one item returned by the search tool: an issue,
//! pull request, or discussion. Records are built only by the content parser
//! and are immutable afterwards.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of item a search result refers to.
///
/// Unrecognized kinds are kept verbatim in [`ResultKind::Other`] so the
/// presentation layer can fall back to a neutral display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultKind {
    /// An issue. Also the default when the payload omits the type.
    #[default]
    Issue,
    /// A pull request.
    PullRequest,
    /// A discussion thread.
    Discussion,
    /// Any other kind reported by the tool.
    Other(String),
}

impl ResultKind {
    /// Wire representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull_request",
            Self::Discussion => "discussion",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ResultKind {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "issue" => Self::Issue,
            "pull_request" => Self::PullRequest,
            "discussion" => Self::Discussion,
            _ => Self::Other(raw),
        }
    }
}

impl From<ResultKind> for String {
    fn from(kind: ResultKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultState {
    /// Open. Also the default when the payload omits the state.
    #[default]
    Open,
    /// Closed without merging.
    Closed,
    /// Merged (pull requests only).
    Merged,
    /// Any other state reported by the tool.
    Other(String),
}

impl ResultState {
    /// Wire representation of the state.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for ResultState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "open" => Self::Open,
            "closed" => Self::Closed,
            "merged" => Self::Merged,
            _ => Self::Other(raw),
        }
    }
}

impl From<ResultState> for String {
    fn from(state: ResultState) -> Self {
        state.as_str().to_owned()
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable item returned by the search tool.
///
/// `url` is the identity of the record. `title` and `url` are always
/// non-empty; the remaining text fields may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Item title, taken from the block heading.
    pub title: String,
    /// Absolute URL of the item.
    pub url: String,
    /// `owner/name` of the repository, or empty.
    pub repository: String,
    /// Item kind. Serialized as `type`.
    #[serde(rename = "type")]
    pub kind: ResultKind,
    /// Item state.
    pub state: ResultState,
    /// Author login, or empty.
    pub author: String,
    /// Creation timestamp as reported by the tool, or empty.
    pub created_at: String,
}
