//! Configuration constants and runtime settings for the harvester.

use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the comment-listing API.
pub const DEFAULT_API_BASE_URL: &str = "https://weibo.com";

/// Path of the comment-listing endpoint, relative to the API base URL.
pub const COMMENTS_ENDPOINT: &str = "/ajax/statuses/buildComments";

/// Comments requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Pause between two page requests (milliseconds).
///
/// The listing API throttles aggressively; one request per second keeps a
/// single session under its limit.
pub const DEFAULT_PAGE_DELAY_MS: u64 = 1000;

/// HTTP timeout in seconds.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Directory artifacts and checkpoints are written to.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Settings for the paginated fetcher and its HTTP client.
#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub page_delay: Duration,
    pub timeout_secs: u64,
    pub output_dir: PathBuf,
}

impl HarvesterConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("WEIBO_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.into());

        let page_size = std::env::var("CRAWL_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let page_delay_ms = std::env::var("CRAWL_PAGE_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PAGE_DELAY_MS);

        let timeout_secs = std::env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(HTTP_TIMEOUT_SECS);

        let output_dir = std::env::var("OUTPUT_DIR")
            .unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.into())
            .into();

        Self {
            api_base_url,
            page_size,
            page_delay: Duration::from_millis(page_delay_ms),
            timeout_secs,
            output_dir,
        }
    }

    /// Create a config builder, starting from the defaults.
    pub fn builder() -> HarvesterConfigBuilder {
        HarvesterConfigBuilder {
            config: Self::default(),
        }
    }
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: Duration::from_millis(DEFAULT_PAGE_DELAY_MS),
            timeout_secs: HTTP_TIMEOUT_SECS,
            output_dir: DEFAULT_OUTPUT_DIR.into(),
        }
    }
}

/// Builder for constructing `HarvesterConfig` in tests and from CLI flags.
pub struct HarvesterConfigBuilder {
    config: HarvesterConfig,
}

impl HarvesterConfigBuilder {
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.config.api_base_url = api_base_url.into();
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn page_delay(mut self, page_delay: Duration) -> Self {
        self.config.page_delay = page_delay;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    pub fn output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = output_dir.into();
        self
    }

    pub fn build(self) -> HarvesterConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvesterConfig::default();
        assert_eq!(config.api_base_url, "https://weibo.com");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.page_delay, Duration::from_secs(1));
        assert_eq!(config.output_dir, PathBuf::from("output"));
    }

    #[test]
    fn test_builder_overrides() {
        let config = HarvesterConfig::builder()
            .api_base_url("http://127.0.0.1:9999")
            .page_size(5)
            .page_delay(Duration::ZERO)
            .output_dir("/tmp/out")
            .build();

        assert_eq!(config.api_base_url, "http://127.0.0.1:9999");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.page_delay, Duration::ZERO);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.timeout_secs, HTTP_TIMEOUT_SECS);
    }
}
