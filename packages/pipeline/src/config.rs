use std::time::Duration;

use comment_harvester::HarvesterError;

use crate::error::Result;

pub const DEFAULT_LLM_API_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_LLM_MODEL: &str = "deepseek-chat";

/// One digit is all a reply should ever contain.
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 8;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 2;

/// Pause between classification calls.
pub const DEFAULT_ITEM_DELAY_MS: u64 = 500;

/// Configuration for LLM-based sentiment classification.
///
/// NOTE: `Debug` is implemented by hand so `api_key` never reaches a log line.
#[derive(Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub api_base_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub item_delay: Duration,
}

impl std::fmt::Debug for ClassifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierConfig")
            .field("api_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("item_delay", &self.item_delay)
            .finish()
    }
}

impl ClassifierConfig {
    /// Load configuration from environment variables.
    ///
    /// A missing `LLM_API_KEY` is reported as missing `api_key` credentials,
    /// the same error the worker gives for an empty key.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| HarvesterError::MissingCredentials("api_key"))?;

        let api_base_url = std::env::var("LLM_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_LLM_API_BASE_URL.into());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_LLM_MODEL.into());

        let temperature = std::env::var("LLM_TEMPERATURE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);

        let max_tokens = std::env::var("LLM_MAX_TOKENS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LLM_MAX_TOKENS);

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LLM_TIMEOUT_SECS);

        let max_retries = std::env::var("LLM_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LLM_MAX_RETRIES);

        let item_delay_ms = std::env::var("CLASSIFY_ITEM_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_ITEM_DELAY_MS);

        Ok(Self {
            api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            max_tokens,
            timeout_secs,
            max_retries,
            item_delay: Duration::from_millis(item_delay_ms),
        })
    }

    /// Create a config builder for testing.
    pub fn builder(api_key: impl Into<String>) -> ClassifierConfigBuilder {
        ClassifierConfigBuilder {
            api_key: api_key.into(),
            api_base_url: DEFAULT_LLM_API_BASE_URL.into(),
            model: DEFAULT_LLM_MODEL.into(),
            temperature: 0.0,
            max_tokens: DEFAULT_LLM_MAX_TOKENS,
            timeout_secs: DEFAULT_LLM_TIMEOUT_SECS,
            max_retries: DEFAULT_LLM_MAX_RETRIES,
            item_delay: Duration::from_millis(DEFAULT_ITEM_DELAY_MS),
        }
    }
}

/// Builder for constructing `ClassifierConfig` in tests.
pub struct ClassifierConfigBuilder {
    api_key: String,
    api_base_url: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: u32,
    item_delay: Duration,
}

impl ClassifierConfigBuilder {
    pub fn api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn item_delay(mut self, item_delay: Duration) -> Self {
        self.item_delay = item_delay;
        self
    }

    pub fn build(self) -> ClassifierConfig {
        ClassifierConfig {
            api_key: self.api_key,
            api_base_url: self.api_base_url.trim_end_matches('/').to_string(),
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            item_delay: self.item_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ClassifierConfig::builder("sk-test").build();
        assert_eq!(config.api_base_url, DEFAULT_LLM_API_BASE_URL);
        assert_eq!(config.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.max_tokens, 8);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.item_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let config = ClassifierConfig::builder("k")
            .api_base_url("http://127.0.0.1:9000/")
            .build();
        assert_eq!(config.api_base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = ClassifierConfig::builder("sk-very-secret").build();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
