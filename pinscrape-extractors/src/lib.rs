//! Search traversal and pin extraction for Pinterest's public search surface.
//!
//! [`SearchPipeline`](pipeline::SearchPipeline) ties the pieces together: a
//! [`RequestClient`](client::RequestClient) fetches pages, the
//! [`RecordExtractor`](extractor::RecordExtractor) normalizes them, the
//! [`Deduplicator`](dedup::Deduplicator) drops repeats and the
//! [`CursorWalker`](cursor::CursorWalker) decides when to stop.

extern crate pinscrape_common;

pub mod client;
pub mod cursor;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod extractor_config;
pub mod pipeline;
pub mod prelude;

mod test;
