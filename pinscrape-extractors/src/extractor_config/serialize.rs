use pinscrape_common::log::debug;

use super::ScraperConfig;
use crate::error::ExtractorError;

impl ScraperConfig {
    /// Reads a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ExtractorError> {
        let config: Self = toml::from_str(contents)?;

        debug!("Scraper config: {:?}", config);
        Ok(config)
    }
}

#[cfg(test)]
mod test {
    use crate::extractor_config::{ScraperConfig, DEFAULT_CONFIG};
    use crate::error::ExtractorError;

    #[test]
    fn empty_document_is_default() {
        let config = ScraperConfig::from_toml_str("").unwrap();
        assert_eq!(config, *DEFAULT_CONFIG);
    }

    #[test]
    fn partial_overrides() {
        let config = ScraperConfig::from_toml_str(
            r#"
            throttle_interval_ms = 1000

            [server]
            page_size = 50

            [retry]
            max_attempts = 5
            base_delay_ms = 250

            [walker]
            duplicate_page_threshold = 4
            "#,
        )
        .unwrap();

        assert_eq!(config.throttle_interval_ms, 1000);
        assert_eq!(config.server.page_size, 50);
        assert_eq!(config.server.name, "pinterest");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.retry.max_delay_ms, 8_000);
        assert_eq!(config.walker.duplicate_page_threshold, 4);
        assert_eq!(config.walker.max_pages, Some(100));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let result = ScraperConfig::from_toml_str("throttle_interval_ms = \"fast\"");
        assert!(matches!(result, Err(ExtractorError::Config { .. })));
    }
}
