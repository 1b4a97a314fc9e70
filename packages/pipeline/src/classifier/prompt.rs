use comment_harvester::Sentiment;

use super::client::{LlmRequest, Message};

const SENTIMENT_INSTRUCTION: &str = include_str!("../../prompts/sentiment_instruction.txt");

/// Build the user prompt asking for a single-digit label for `text`.
pub fn build_sentiment_prompt(text: &str) -> String {
    let mut prompt = String::with_capacity(SENTIMENT_INSTRUCTION.len() + text.len() + 1);
    prompt.push_str(SENTIMENT_INSTRUCTION.trim_end());
    prompt.push('\n');
    prompt.push_str(text);
    prompt
}

/// Wrap the prompt for `text` in a single-message request.
pub fn build_sentiment_request(text: &str, max_tokens: u32, temperature: f64) -> LlmRequest {
    LlmRequest {
        messages: vec![Message::user(build_sentiment_prompt(text))],
        max_tokens,
        temperature,
    }
}

/// Map a model reply onto a label.
///
/// Only a reply that is exactly `0`, `1` or `2` after trimming counts;
/// "1." or "2 (negative)" are treated as unrecognized.
pub fn parse_sentiment(reply: &str) -> Option<Sentiment> {
    match reply.trim() {
        "0" => Some(Sentiment::Positive),
        "1" => Some(Sentiment::Neutral),
        "2" => Some(Sentiment::Negative),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_ends_with_comment_text() {
        let prompt = build_sentiment_prompt("今天天气真好");
        assert!(prompt.ends_with("\n今天天气真好"));
        assert!(prompt.contains('0') && prompt.contains('1') && prompt.contains('2'));
    }

    #[test]
    fn test_request_carries_generation_settings() {
        let request = build_sentiment_request("x", 8, 0.0);
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.max_tokens, 8);
    }

    #[test]
    fn test_parse_exact_digits() {
        assert_eq!(parse_sentiment("0"), Some(Sentiment::Positive));
        assert_eq!(parse_sentiment(" 1\n"), Some(Sentiment::Neutral));
        assert_eq!(parse_sentiment("2"), Some(Sentiment::Negative));
    }

    #[test]
    fn test_parse_rejects_anything_else() {
        for reply in ["", "3", "01", "2.", "positive", "1 neutral", "-1"] {
            assert_eq!(parse_sentiment(reply), None, "reply {reply:?}");
        }
    }
}
