//! Network side of the extractor.
//!
//! [`RequestClient`] turns a `(query, cursor)` pair into a [`RawPage`], retrying
//! transient failures on a bounded schedule and spacing requests with a [`Throttle`].
//! The actual I/O sits behind the [`Transport`] trait so the retry contract can be
//! exercised without touching the network.
use pinscrape_common::{
    log::{debug, warn},
    query::SearchQuery,
    reqwest::{header::ACCEPT, Client, Url},
    serde_json::json,
    tokio::time::{sleep, Instant},
};
use std::future::Future;

use crate::{
    cursor::PageCursor,
    error::{ExtractorError, FetchError, FetchErrorKind, TransportError},
    extractor_config::{ScraperConfig, ServerConfig},
};

use self::{retry::RetryPolicy, throttle::Throttle};

pub mod retry;
pub mod throttle;

/// Everything needed to ask for one page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub cursor: PageCursor,
}

impl PageRequest {
    /// Builds the search resource request for `query` at `cursor`.
    ///
    /// `search_source` is the already validated [`ServerConfig::search_source`].
    pub fn new(
        server: &ServerConfig,
        search_source: &Url,
        query: &SearchQuery,
        cursor: &PageCursor,
    ) -> Self {
        let mut source = search_source.clone();
        source
            .query_pairs_mut()
            .append_pair("q", query.query())
            .append_pair("rs", "typed");
        let source_url = format!("{}?{}", source.path(), source.query().unwrap_or_default());

        let mut options = json!({
            "query": query.query(),
            "scope": query.filter().scope(),
            "rs": "typed",
            "page_size": server.page_size,
            "source_url": source_url,
            "redux_normalize_feed": true,
        });
        if let Some(token) = &cursor.token {
            options["bookmarks"] = json!([token]);
        }
        let data = json!({ "options": options, "context": {} });

        Self {
            url: server.search_resource_url.clone(),
            params: vec![
                (String::from("source_url"), source_url),
                (String::from("data"), data.to_string()),
            ],
            cursor: cursor.clone(),
        }
    }
}

/// Status and body of an HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one request. Implementations must not retry on their own.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        request: &PageRequest,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ScraperConfig) -> Result<Self, ExtractorError> {
        let client = Client::builder()
            .user_agent(&config.server.user_agent)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client })
    }

    /// Returns the used client for external use.
    pub fn client(&self) -> Client {
        self.client.clone()
    }
}

impl Transport for HttpTransport {
    async fn get(&self, request: &PageRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(&request.url)
            .query(&request.params)
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01")
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

/// Unparsed page body together with the cursor that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub body: String,
    pub cursor: PageCursor,
}

/// Fetches pages with retry and rate limiting.
#[derive(Debug, Clone)]
pub struct RequestClient<T = HttpTransport> {
    transport: T,
    server: ServerConfig,
    search_source: Url,
    retry: RetryPolicy,
    throttle: Throttle,
    blocked_markers: Vec<String>,
}

impl RequestClient<HttpTransport> {
    /// Client talking to Pinterest over HTTP with its own throttle.
    pub fn from_config(config: &ScraperConfig) -> Result<Self, ExtractorError> {
        Self::with_transport(HttpTransport::new(config)?, config)
    }
}

impl<T: Transport> RequestClient<T> {
    /// Fails when the configured server URLs don't form a valid search page URL.
    pub fn with_transport(transport: T, config: &ScraperConfig) -> Result<Self, ExtractorError> {
        let search_source = config.server.search_source()?;

        Ok(Self {
            transport,
            server: config.server.clone(),
            search_source,
            retry: config.retry,
            throttle: Throttle::new(config.throttle_interval()),
            blocked_markers: config
                .blocked_markers
                .iter()
                .map(|marker| marker.to_lowercase())
                .collect(),
        })
    }

    /// Replaces the throttle, e.g. with a clone shared by several pipelines.
    #[must_use]
    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    #[inline]
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    #[inline]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    #[inline]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetches the page at `cursor`, retrying `Network` and `RateLimited` failures.
    pub async fn fetch(
        &self,
        query: &SearchQuery,
        cursor: &PageCursor,
    ) -> Result<RawPage, FetchError> {
        let request = PageRequest::new(&self.server, &self.search_source, query, cursor);

        let mut attempt = 1;
        loop {
            self.throttle.acquire().await;

            debug!(
                "Fetching page {} for {:?} (attempt {attempt})",
                cursor.sequence,
                query.query()
            );
            let start_point = Instant::now();
            let outcome = self.attempt(&request).await;
            debug!("Request took {:?}", start_point.elapsed());

            match outcome {
                Ok(body) => {
                    return Ok(RawPage {
                        body,
                        cursor: cursor.clone(),
                    })
                }
                Err((kind, detail)) if self.retry.should_retry(kind, attempt) => {
                    let delay = self.retry.delay_for(kind, attempt);
                    warn!(
                        "Request attempt {attempt} failed ({kind}: {detail}). Retrying in {:.2}s...",
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err((kind, detail)) => {
                    return Err(FetchError {
                        kind,
                        attempts: attempt,
                        detail,
                    })
                }
            }
        }
    }

    async fn attempt(&self, request: &PageRequest) -> Result<String, (FetchErrorKind, String)> {
        let response = self
            .transport
            .get(request)
            .await
            .map_err(|e| (FetchErrorKind::Network, e.to_string()))?;

        self.classify(response)
    }

    fn classify(&self, response: TransportResponse) -> Result<String, (FetchErrorKind, String)> {
        match response.status {
            200..=299 => {
                if !looks_like_json(&response.body) && self.is_challenge(&response.body) {
                    return Err((
                        FetchErrorKind::Blocked,
                        String::from("anti-automation challenge page"),
                    ));
                }
                Ok(response.body)
            }
            429 => Err((FetchErrorKind::RateLimited, String::from("HTTP 429"))),
            408 | 500..=599 => Err((
                FetchErrorKind::Network,
                format!("server error {}", response.status),
            )),
            401 | 403 => Err((
                FetchErrorKind::Blocked,
                format!("access refused with HTTP {}", response.status),
            )),
            status => Err((
                FetchErrorKind::Blocked,
                format!("unexpected HTTP status {status}"),
            )),
        }
    }

    fn is_challenge(&self, body: &str) -> bool {
        let lowered = body.to_lowercase();
        self.blocked_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
    }
}

fn looks_like_json(body: &str) -> bool {
    matches!(body.trim_start().chars().next(), Some('{' | '['))
}
