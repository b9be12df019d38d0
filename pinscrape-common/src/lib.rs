//! Shared data model for the Pinterest search extractor.
//!
//! Everything the traversal produces or consumes lives here: the validated
//! [`SearchQuery`](query::SearchQuery) that starts a run, and the normalized
//! [`PinRecord`](pin::PinRecord) that comes out of it.

// Public Exports
pub use chrono;
pub use log;
pub use reqwest;
pub use serde;
pub use serde_json;
pub use tokio;

pub mod pin;
pub mod query;
