use pinscrape_common::query::QueryError;
use std::fmt::Display;
use thiserror::Error;

/// Errors raised while setting an extractor up, before any page is fetched.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The configuration document could not be parsed.
    #[error("Invalid scraper configuration: {source}")]
    Config {
        #[from]
        source: toml::de::Error,
    },

    /// The HTTP client could not be built from the configured server settings.
    #[error("Failed to build HTTP client")]
    ClientBuild(#[from] reqwest::Error),

    /// `base_url` and `search_source_path` don't join into an absolute URL.
    #[error("Invalid search page URL {url:?}: {reason}")]
    InvalidServerUrl { url: String, reason: String },

    /// The search input did not pass validation.
    #[error("Invalid search query: {source}")]
    Query {
        #[from]
        source: QueryError,
    },

    /// A request payload could not be encoded.
    #[error("Error while serializing JSON")]
    JsonSerializeFail(#[from] serde_json::Error),
}

/// Failure of the transport itself, before any HTTP status is available.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection Error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Request could not be built: {0}")]
    Request(String),
}

/// How a fetch failed. Only `Blocked` is never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// Connection problems, timeouts and server-side errors.
    Network,
    /// The server asked us to slow down (HTTP 429).
    RateLimited,
    /// Anti-automation challenge or refused access.
    Blocked,
}

impl FetchErrorKind {
    #[inline]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }
}

impl Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "NetworkError"),
            Self::RateLimited => write!(f, "RateLimited"),
            Self::Blocked => write!(f, "Blocked"),
        }
    }
}

/// A page fetch that gave up, tagged with how many attempts were made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} after {attempts} attempt(s): {detail}")]
pub struct FetchError {
    pub kind: FetchErrorKind,
    pub attempts: u32,
    pub detail: String,
}

/// Run-level failure reported by the search pipeline.
///
/// Carries enough context for the caller to decide whether the records already
/// received are worth keeping and where a later run could pick up from.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Search failed on page {page_index} with {kind} after emitting {emitted} record(s)")]
pub struct SearchFailure {
    pub kind: FetchErrorKind,
    pub attempts: u32,
    /// Sequence number of the page being fetched.
    pub page_index: u32,
    /// Continuation token of the page being fetched, `None` on the first page.
    pub cursor: Option<String>,
    /// Records handed to the consumer before the failure.
    pub emitted: usize,
    #[source]
    pub source: FetchError,
}
