//! Tunables for the Pinterest search extractor.
//!
//! Every field has a default, so a TOML document only needs the keys it wants to change:
//!
//! ```toml
//! throttle_interval_ms = 1000
//!
//! [retry]
//! max_attempts = 5
//!
//! [walker]
//! duplicate_page_threshold = 3
//! ```
use once_cell::sync::Lazy;
use pinscrape_common::reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

use crate::client::retry::RetryPolicy;
use crate::cursor::WalkerConfig;
use crate::error::ExtractorError;

pub mod serialize;

pub(crate) const DEFAULT_EXT_UA: &str =
    concat!("Rust Pinterest Search Extractor/", env!("CARGO_PKG_VERSION"));

pub static DEFAULT_CONFIG: Lazy<ScraperConfig> = Lazy::new(ScraperConfig::default);

/// Where and how to reach the search surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub base_url: String,
    /// JSON resource answering search requests.
    pub search_resource_url: String,
    /// Path of the human-facing search page, sent as `source_url`.
    pub search_source_path: String,
    pub user_agent: String,
    /// Entries requested per page.
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: String::from("pinterest"),
            base_url: String::from("https://www.pinterest.com"),
            search_resource_url: String::from(
                "https://www.pinterest.com/resource/BaseSearchResource/get/",
            ),
            search_source_path: String::from("/search/pins/"),
            user_agent: DEFAULT_EXT_UA.to_string(),
            page_size: 25,
            timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// Human-facing search page URL, `base_url` joined with `search_source_path`.
    pub fn search_source(&self) -> Result<Url, ExtractorError> {
        let invalid = |reason: String| ExtractorError::InvalidServerUrl {
            url: format!("{}{}", self.base_url, self.search_source_path),
            reason,
        };

        let url = Url::parse(&self.base_url)
            .and_then(|base| base.join(&self.search_source_path))
            .map_err(|e| invalid(e.to_string()))?;

        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(invalid(String::from("no host")));
        }
        Ok(url)
    }
}

impl Display for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Everything a search pipeline can be tuned with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub server: ServerConfig,
    pub retry: RetryPolicy,
    /// Minimum time between two request starts.
    pub throttle_interval_ms: u64,
    pub walker: WalkerConfig,
    /// Lowercase fragments that mark a non-JSON response as an anti-automation challenge.
    pub blocked_markers: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            retry: RetryPolicy::default(),
            throttle_interval_ms: 750,
            walker: WalkerConfig::default(),
            blocked_markers: [
                "/challenge/",
                "cf-chl",
                "px-captcha",
                "challenge-platform",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl ScraperConfig {
    #[inline]
    pub const fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    #[inline]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.server.timeout_secs)
    }
}
