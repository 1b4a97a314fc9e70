mod client;
mod prompt;

pub use client::{ChatCompletionsClient, LlmClient, LlmRequest, LlmResponse, Message, Role};
#[cfg(any(test, feature = "test-utils"))]
pub use client::test_support::MockLlmClient;
pub use prompt::{build_sentiment_prompt, build_sentiment_request, parse_sentiment};
