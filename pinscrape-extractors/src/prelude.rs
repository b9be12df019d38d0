pub use crate::client::retry::RetryPolicy;
pub use crate::client::throttle::Throttle;
pub use crate::client::{HttpTransport, RequestClient, Transport};
pub use crate::cursor::{EndReason, PageCursor, WalkerConfig};
pub use crate::error::{ExtractorError, FetchErrorKind, SearchFailure};
pub use crate::extractor::RecordExtractor;
pub use crate::extractor_config::{ScraperConfig, DEFAULT_CONFIG};
pub use crate::pipeline::{CancelHandle, RunSummary, SearchPipeline};

pub use pinscrape_common::pin::PinRecord;
pub use pinscrape_common::query::{SearchFilter, SearchQuery};
