//! Run-scoped duplicate filter.
//!
//! Pinterest pagination re-surfaces pins it already returned, so every record is
//! checked against the ids seen earlier in the same run.
use ahash::AHashSet;
use pinscrape_common::pin::PinRecord;

#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    seen: AHashSet<String>,
    dropped: u64,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time the record's id shows up, `false` afterwards.
    pub fn admit(&mut self, record: &PinRecord) -> bool {
        if self.seen.contains(&record.id) {
            self.dropped += 1;
            return false;
        }
        self.seen.insert(record.id.clone())
    }

    /// Number of distinct ids admitted.
    #[inline]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Get the total number of repeats rejected so far.
    #[inline]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }
}
