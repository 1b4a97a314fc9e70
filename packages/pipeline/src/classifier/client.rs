use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{PipelineError, Result};

/// Role of a message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Request to the LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Response from the LLM.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Trait for LLM clients, enabling mocking in tests.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;
}

/// Client for OpenAI-compatible `chat/completions` endpoints (DeepSeek by default).
///
/// NOTE: Do NOT derive `Debug` on this struct, `api_key` would be exposed.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    api_base_url: String,
    model: String,
    max_retries: u32,
    retry_base_delay: Duration,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatErrorResponse {
    error: Option<ChatErrorDetail>,
}

#[derive(Deserialize)]
struct ChatErrorDetail {
    message: String,
}

impl ChatCompletionsClient {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(PipelineError::LlmApiRequest)?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_base_url: config.api_base_url.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_secs(1),
        })
    }

    /// Override the first backoff step; later steps double it.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/v1/chat/completions", self.api_base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: false,
        };

        let max_attempts = self.max_retries + 1;
        let mut last_error: Option<PipelineError> = None;
        let mut next_delay = Duration::ZERO;

        for attempt in 0..max_attempts {
            if attempt > 0 {
                debug!(attempt, "retrying LLM request after {:?}", next_delay);
                tokio::time::sleep(next_delay).await;
            }

            next_delay = self.backoff(attempt);

            let resp = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await;

            let resp = match resp {
                Ok(r) => r,
                Err(e) => {
                    warn!(attempt, error = %e, "LLM request failed");
                    last_error = Some(PipelineError::LlmApiRequest(e));
                    continue;
                }
            };

            let status = resp.status().as_u16();

            if status == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok());
                warn!(attempt, retry_after, "LLM rate limited");
                if let Some(secs) = retry_after {
                    next_delay = Duration::from_secs(secs).max(next_delay);
                }
                last_error = Some(PipelineError::LlmRateLimited {
                    retry_after_secs: retry_after.unwrap_or(next_delay.as_secs()),
                });
                continue;
            }

            if status >= 500 {
                let body_text = resp.text().await.unwrap_or_default();
                warn!(attempt, status, body = %body_text, "LLM server error");
                last_error = Some(PipelineError::LlmApiError {
                    status,
                    message: body_text,
                });
                continue;
            }

            if !(200..300).contains(&status) {
                let body_text = resp.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ChatErrorResponse>(&body_text)
                    .ok()
                    .and_then(|r| r.error)
                    .map(|e| e.message)
                    .unwrap_or(body_text);
                return Err(PipelineError::LlmApiError { status, message });
            }

            let api_response: ChatResponse = resp
                .json()
                .await
                .map_err(|e| PipelineError::LlmResponseParse(e.to_string()))?;

            let content = api_response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default();

            if content.trim().is_empty() {
                return Err(PipelineError::LlmEmptyResponse);
            }

            let (input_tokens, output_tokens) = api_response
                .usage
                .map(|u| (u.prompt_tokens, u.completion_tokens))
                .unwrap_or_default();

            return Ok(LlmResponse {
                content,
                input_tokens,
                output_tokens,
            });
        }

        Err(last_error.unwrap_or(PipelineError::LlmEmptyResponse))
    }
}

/// Test utilities for the LLM client.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Mock LLM client for testing. Returns pre-configured responses in order.
    pub struct MockLlmClient {
        responses: Mutex<Vec<Result<LlmResponse>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmClient {
        pub fn new(responses: Vec<Result<LlmResponse>>) -> Self {
            // Reverse so we can pop from the end
            let mut responses = responses;
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(content: &str) -> Self {
            Self::with_responses(vec![content])
        }

        pub fn with_responses(contents: Vec<&str>) -> Self {
            Self::new(
                contents
                    .into_iter()
                    .map(|c| {
                        Ok(LlmResponse {
                            content: c.to_string(),
                            input_tokens: 40,
                            output_tokens: 1,
                        })
                    })
                    .collect(),
            )
        }

        /// User prompts received so far, in call order.
        pub fn prompts(&self) -> Vec<String> {
            self.prompts
                .lock()
                .map(|p| p.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.extend(request.messages.iter().map(|m| m.content.clone()));
            }
            let mut responses = self.responses.lock().map_err(|e| {
                PipelineError::LlmResponseParse(format!("mock lock poisoned: {e}"))
            })?;
            responses.pop().unwrap_or(Err(PipelineError::LlmEmptyResponse))
        }
    }
}
