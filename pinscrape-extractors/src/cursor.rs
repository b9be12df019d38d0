//! Pagination state and the policy that decides when a search is used up.
use pinscrape_common::log::debug;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Bookmark Pinterest hands out once there is nothing left to page through.
pub const END_BOOKMARK: &str = "-end-";

/// Continuation token plus page sequence number.
///
/// The first page has no token and sequence `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub token: Option<String>,
    pub sequence: u32,
}

impl PageCursor {
    /// Cursor for the first page of a search.
    #[inline]
    pub const fn first() -> Self {
        Self {
            token: None,
            sequence: 0,
        }
    }

    /// Cursor that resumes a search from a persisted bookmark.
    pub fn resume<S: Into<String>>(token: S, sequence: u32) -> Self {
        Self {
            token: Some(token.into()),
            sequence,
        }
    }

    #[inline]
    pub const fn is_first(&self) -> bool {
        self.token.is_none()
    }
}

/// Why a run stopped without failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndReason {
    /// The requested number of records was emitted.
    LimitReached,
    /// A page came back without any parseable entry.
    NoEntries,
    /// No continuation token, the terminal token, or the same token again.
    NoProgress,
    /// Too many consecutive pages held nothing but repeats.
    DuplicateLoop,
    /// The configured page ceiling was hit.
    PageCap,
    /// The caller asked the run to stop.
    Cancelled,
}

impl Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::LimitReached => "limit reached",
            Self::NoEntries => "page without entries",
            Self::NoProgress => "no continuation",
            Self::DuplicateLoop => "pagination loop",
            Self::PageCap => "page cap",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{text}")
    }
}

/// What the walker needs to know about the page it just saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSummary {
    /// Candidate records extracted from the page.
    pub entries: usize,
    /// Records from the page that were not seen earlier in the run.
    pub fresh: usize,
    /// Continuation token returned with the page.
    pub bookmark: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorStep {
    Next(PageCursor),
    Exhausted(EndReason),
}

/// Thresholds for [`CursorWalker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerConfig {
    /// Consecutive all-duplicate pages that end the walk.
    pub duplicate_page_threshold: u32,
    /// Highest page sequence that may be requested. `None` means unbounded.
    pub max_pages: Option<u32>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            duplicate_page_threshold: 1,
            max_pages: Some(100),
        }
    }
}

/// Decides, page after page, whether another fetch makes sense.
#[derive(Debug, Clone)]
pub struct CursorWalker {
    config: WalkerConfig,
    stale_pages: u32,
}

impl CursorWalker {
    pub const fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            stale_pages: 0,
        }
    }

    /// Consecutive all-duplicate pages seen so far.
    #[inline]
    pub const fn stale_pages(&self) -> u32 {
        self.stale_pages
    }

    pub fn advance(&mut self, previous: &PageCursor, page: &PageSummary) -> CursorStep {
        if page.entries == 0 {
            debug!("Page {} had no entries", previous.sequence);
            return CursorStep::Exhausted(EndReason::NoEntries);
        }

        if page.fresh == 0 {
            self.stale_pages += 1;
            debug!(
                "Page {} only repeated known pins ({} in a row)",
                previous.sequence, self.stale_pages
            );
            if self.stale_pages >= self.config.duplicate_page_threshold.max(1) {
                return CursorStep::Exhausted(EndReason::DuplicateLoop);
            }
        } else {
            self.stale_pages = 0;
        }

        let token = match page.bookmark.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() && token != END_BOOKMARK => token,
            _ => return CursorStep::Exhausted(EndReason::NoProgress),
        };

        if previous.token.as_deref() == Some(token) {
            debug!("Bookmark did not move past page {}", previous.sequence);
            return CursorStep::Exhausted(EndReason::NoProgress);
        }

        let sequence = previous.sequence.saturating_add(1);
        if self.config.max_pages.is_some_and(|max| sequence > max) {
            debug!("Max number of pages reached");
            return CursorStep::Exhausted(EndReason::PageCap);
        }

        CursorStep::Next(PageCursor {
            token: Some(token.to_string()),
            sequence,
        })
    }
}
