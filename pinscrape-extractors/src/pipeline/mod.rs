//! Search traversal.
//!
//! A [`SearchPipeline`] owns everything one run needs (client, walker, seen ids) and
//! walks `Idle → Fetching → Extracting → Emitting → Fetching …` until the limit is
//! met, the results run out, the caller cancels, or a fetch fails for good.
//!
//! Records come out one at a time through [`SearchPipeline::next_record`], so a
//! consumer can start writing them before the last page has been requested.
use pinscrape_common::{
    log::{debug, error, info},
    pin::PinRecord,
    query::SearchQuery,
};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    client::{HttpTransport, RawPage, RequestClient, Transport},
    cursor::{CursorStep, CursorWalker, EndReason, PageCursor, PageSummary, WalkerConfig},
    dedup::Deduplicator,
    error::{ExtractorError, FetchError, SearchFailure},
    extractor::RecordExtractor,
    extractor_config::ScraperConfig,
};

mod unsync;

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Fetching,
    Extracting,
    Emitting,
    Exhausted(EndReason),
    Failed,
}

impl PipelineState {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted(_) | Self::Failed)
    }
}

/// Cooperative stop signal. Clones control the same run.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the run to stop before its next state transition.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run traversal state. Never shared between pipelines.
#[derive(Debug, Clone, Default)]
pub struct TraversalState {
    pub cursor: PageCursor,
    pub emitted: usize,
    pub seen: Deduplicator,
    pub exhausted: bool,
    /// Cursor of the last page that was fetched successfully.
    pub last_good_cursor: Option<PageCursor>,
}

/// Counters describing a run so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub emitted: usize,
    pub pages_fetched: u32,
    pub duplicates_dropped: u64,
    pub candidates_seen: usize,
    pub skipped_entries: usize,
    /// Why the run ended; `None` while running or after a failure.
    pub end: Option<EndReason>,
    pub resume_cursor: Option<PageCursor>,
}

/// One search run over Pinterest results.
#[derive(Debug)]
pub struct SearchPipeline<T = HttpTransport> {
    query: SearchQuery,
    client: RequestClient<T>,
    extractor: RecordExtractor,
    walker: CursorWalker,
    traversal: TraversalState,
    state: PipelineState,
    raw_page: Option<RawPage>,
    pending: VecDeque<PinRecord>,
    page: PageSummary,
    cancel: CancelHandle,
    pages_fetched: u32,
    candidates_seen: usize,
    skipped_entries: usize,
}

impl SearchPipeline<HttpTransport> {
    /// Pipeline talking to Pinterest over HTTP.
    pub fn new(query: SearchQuery, config: &ScraperConfig) -> Result<Self, ExtractorError> {
        let client = RequestClient::from_config(config)?;
        Ok(Self::with_client(query, client, config.walker))
    }
}

impl<T: Transport> SearchPipeline<T> {
    pub fn with_client(query: SearchQuery, client: RequestClient<T>, walker: WalkerConfig) -> Self {
        Self {
            query,
            client,
            extractor: RecordExtractor::new(),
            walker: CursorWalker::new(walker),
            traversal: TraversalState::default(),
            state: PipelineState::Idle,
            raw_page: None,
            pending: VecDeque::new(),
            page: PageSummary::default(),
            cancel: CancelHandle::new(),
            pages_fetched: 0,
            candidates_seen: 0,
            skipped_entries: 0,
        }
    }

    /// Starts the run from a cursor persisted by an earlier run instead of the first page.
    ///
    /// Ids seen by the earlier run are not known here, so repeats across the two runs
    /// are possible.
    #[must_use]
    pub fn with_start_cursor(mut self, cursor: PageCursor) -> Self {
        if self.state == PipelineState::Idle {
            self.traversal.cursor = cursor;
        }
        self
    }

    /// Uses an externally created cancel handle.
    #[must_use]
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that stops this run when cancelled.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    #[inline]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    #[inline]
    pub const fn query(&self) -> &SearchQuery {
        &self.query
    }

    #[inline]
    pub const fn traversal(&self) -> &TraversalState {
        &self.traversal
    }

    /// Cursor of the last successfully fetched page, for resuming in a later run.
    pub fn resume_cursor(&self) -> Option<&PageCursor> {
        self.traversal.last_good_cursor.as_ref()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            emitted: self.traversal.emitted,
            pages_fetched: self.pages_fetched,
            duplicates_dropped: self.traversal.seen.dropped(),
            candidates_seen: self.candidates_seen,
            skipped_entries: self.skipped_entries,
            end: match self.state {
                PipelineState::Exhausted(reason) => Some(reason),
                _ => None,
            },
            resume_cursor: self.traversal.last_good_cursor.clone(),
        }
    }

    /// Drives the run until the next record is ready.
    ///
    /// Returns `Some(Err(_))` once when a fetch fails for good and `None` from then on,
    /// or as soon as the run is exhausted.
    pub async fn next_record(&mut self) -> Option<Result<PinRecord, SearchFailure>> {
        loop {
            if !self.state.is_terminal() && self.cancel.is_cancelled() {
                self.finish(EndReason::Cancelled);
                return None;
            }

            match self.state {
                PipelineState::Idle => {
                    info!(
                        "Fetching Pinterest search results for query {:?} (filter {}, limit {})",
                        self.query.query(),
                        self.query.filter(),
                        self.query.limit()
                    );
                    self.state = PipelineState::Fetching;
                }
                PipelineState::Fetching => {
                    match self.client.fetch(&self.query, &self.traversal.cursor).await {
                        Ok(raw) => {
                            self.pages_fetched += 1;
                            self.traversal.last_good_cursor = Some(raw.cursor.clone());
                            self.raw_page = Some(raw);
                            self.state = PipelineState::Extracting;
                        }
                        Err(source) => return Some(Err(self.fail(source))),
                    }
                }
                PipelineState::Extracting => {
                    let extracted = self
                        .raw_page
                        .take()
                        .map(|raw| self.extractor.parse(&raw))
                        .unwrap_or_default();

                    self.candidates_seen += extracted.entries();
                    self.skipped_entries += extracted.skipped;
                    self.page = PageSummary {
                        entries: extracted.entries(),
                        fresh: 0,
                        bookmark: extracted.bookmark,
                    };
                    self.pending = extracted.records.into();
                    self.state = PipelineState::Emitting;
                }
                PipelineState::Emitting => {
                    if let Some(record) = self.pending.pop_front() {
                        if !self.traversal.seen.admit(&record) {
                            debug!("Dropping repeated pin {}", record.id);
                            continue;
                        }

                        self.page.fresh += 1;
                        self.traversal.emitted += 1;
                        if self.traversal.emitted >= self.query.limit() {
                            debug!("Target pin count of {} reached.", self.query.limit());
                            self.finish(EndReason::LimitReached);
                        }
                        return Some(Ok(record));
                    }

                    match self.walker.advance(&self.traversal.cursor, &self.page) {
                        CursorStep::Next(cursor) => {
                            debug!("Bookmark for page {}: {:?}", cursor.sequence, cursor.token);
                            self.traversal.cursor = cursor;
                            self.state = PipelineState::Fetching;
                        }
                        CursorStep::Exhausted(reason) => {
                            self.finish(reason);
                            return None;
                        }
                    }
                }
                PipelineState::Exhausted(_) | PipelineState::Failed => return None,
            }
        }
    }

    fn finish(&mut self, reason: EndReason) {
        self.pending.clear();
        self.raw_page = None;
        self.traversal.exhausted = true;
        self.state = PipelineState::Exhausted(reason);
        info!(
            "Search for {:?} finished ({reason}): {} pin(s) from {} page(s)",
            self.query.query(),
            self.traversal.emitted,
            self.pages_fetched
        );
    }

    fn fail(&mut self, source: FetchError) -> SearchFailure {
        self.state = PipelineState::Failed;
        let failure = SearchFailure {
            kind: source.kind,
            attempts: source.attempts,
            page_index: self.traversal.cursor.sequence,
            cursor: self.traversal.cursor.token.clone(),
            emitted: self.traversal.emitted,
            source,
        };
        error!("{failure}: {}", failure.source);
        failure
    }
}
