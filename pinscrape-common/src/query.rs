//! Search input accepted by the extractor.
//!
//! A [`SearchQuery`] can only be built through [`SearchQuery::new`], so any value
//! the pipeline receives already has a non-empty query text and a positive limit.
use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QueryError {
    #[error("Result limit must be greater than zero")]
    ZeroLimit,

    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Unknown content filter: {filter} (expected `all` or `videos`)")]
    UnknownFilter { filter: String },
}

/// Content filter applied to a search.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    /// Every kind of pin.
    #[default]
    All,
    /// Only video pins.
    Videos,
}

impl SearchFilter {
    /// Value of the `scope` option sent to the search resource.
    #[inline]
    pub const fn scope(self) -> &'static str {
        match self {
            Self::All => "pins",
            Self::Videos => "videos",
        }
    }
}

impl Display for SearchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Videos => write!(f, "videos"),
        }
    }
}

impl FromStr for SearchFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "videos" => Ok(Self::Videos),
            _ => Err(QueryError::UnknownFilter {
                filter: s.to_string(),
            }),
        }
    }
}

/// One search job: what to look for, which kind of pins, and how many of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    query: String,
    filter: SearchFilter,
    limit: usize,
}

impl SearchQuery {
    /// Validates and builds a query. The query text is stored trimmed.
    pub fn new<S>(query: S, filter: SearchFilter, limit: usize) -> Result<Self, QueryError>
    where
        S: AsRef<str>,
    {
        if limit == 0 {
            return Err(QueryError::ZeroLimit);
        }

        let query = query.as_ref().trim();
        if query.is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        Ok(Self {
            query: query.to_string(),
            filter,
            limit,
        })
    }

    #[inline]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[inline]
    pub const fn filter(&self) -> SearchFilter {
        self.filter
    }

    #[inline]
    pub const fn limit(&self) -> usize {
        self.limit
    }
}
