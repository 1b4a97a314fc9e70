//! Core data types for the harvester.
//!
//! Field names of [`CommentRecord`] are the column names of the CSV
//! artifacts, so downstream consumers can read them without a mapping.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// A single comment as fetched from the listing API. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Platform identifier of the comment.
    pub comment_id: String,

    /// Raw comment text.
    pub content: String,

    /// Creation time exactly as the platform reports it.
    pub created_at: String,

    /// Display name of the author.
    pub user_name: String,

    /// Number of likes at fetch time.
    pub like_count: u64,
}

/// Three-class sentiment label.
///
/// Serialized as its integer code (`0`, `1`, `2`) in artifacts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(into = "u8", try_from = "u8")]
#[strum(serialize_all = "lowercase")]
pub enum Sentiment {
    Positive = 0,
    Neutral = 1,
    Negative = 2,
}

impl Sentiment {
    /// Label substituted when classification fails or is ambiguous.
    pub const FALLBACK: Sentiment = Sentiment::Neutral;

    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map an integer code back to a label.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Positive),
            1 => Some(Self::Neutral),
            2 => Some(Self::Negative),
            _ => None,
        }
    }
}

impl From<Sentiment> for u8 {
    fn from(sentiment: Sentiment) -> Self {
        sentiment.code()
    }
}

impl TryFrom<u8> for Sentiment {
    type Error = String;

    fn try_from(code: u8) -> std::result::Result<Self, Self::Error> {
        Self::from_code(code).ok_or_else(|| format!("invalid sentiment code {code}"))
    }
}

/// A comment with its sentiment label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledComment {
    pub record: CommentRecord,
    pub sentiment: Sentiment,
}

impl LabeledComment {
    pub fn new(record: CommentRecord, sentiment: Sentiment) -> Self {
        Self { record, sentiment }
    }
}

/// Thread identifiers resolved from a seed reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRef {
    /// Identifier of the post whose comments are listed (`mid`).
    pub thread_id: String,

    /// Identifier of the account that owns the post (`uid`).
    pub owner_id: String,
}

/// Position in a paginated comment listing.
///
/// A `None` token is the start sentinel; the cursor only ever moves forward.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCursor {
    /// Continuation token handed out by the server with the previous page.
    pub token: Option<String>,

    /// Number of pages consumed before this position.
    pub page: u32,
}

impl FetchCursor {
    /// Cursor for the first page of a listing.
    pub fn start() -> Self {
        Self::default()
    }

    /// Token value to send with the request; `"0"` asks for the first page.
    #[must_use]
    pub fn request_token(&self) -> &str {
        self.token.as_deref().unwrap_or("0")
    }

    /// Cursor for the page after this one.
    #[must_use]
    pub fn advance(&self, token: String) -> Self {
        Self {
            token: Some(token),
            page: self.page + 1,
        }
    }
}

/// One page of the comment listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentPage {
    pub comments: Vec<CommentRecord>,

    /// Token for the next page; `None` marks the end of the stream.
    pub next_token: Option<String>,
}

/// Whether an artifact holds a finished run or a stopped one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Full,
    Partial,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Ran to the end of its input.
    Completed,

    /// Stopped at an iteration boundary on request.
    Stopped,

    /// Aborted by an error; partial results were still saved.
    Failed(String),
}

impl Termination {
    /// Artifact kind a run ending this way is saved as.
    #[must_use]
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            Self::Completed => ArtifactKind::Full,
            Self::Stopped | Self::Failed(_) => ArtifactKind::Partial,
        }
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Result of a fetch run.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Artifact written, or `None` if nothing was fetched.
    pub artifact: Option<std::path::PathBuf>,
    pub records: usize,
    /// Pages requested during this run (excluding earlier resumed runs).
    pub pages: u32,
    pub termination: Termination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_sentiment_codes() {
        assert_eq!(Sentiment::Positive.code(), 0);
        assert_eq!(Sentiment::Neutral.code(), 1);
        assert_eq!(Sentiment::Negative.code(), 2);
        assert_eq!(Sentiment::from_code(3), None);
        assert_eq!(Sentiment::FALLBACK, Sentiment::Neutral);
    }

    #[test]
    fn test_sentiment_order_and_names() {
        let names: Vec<String> = Sentiment::iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["positive", "neutral", "negative"]);
        assert_eq!(Sentiment::from_str("negative").ok(), Some(Sentiment::Negative));
    }

    #[test]
    fn test_sentiment_serializes_as_code() {
        let json = serde_json::to_string(&Sentiment::Negative).unwrap();
        assert_eq!(json, "2");
        let back: Sentiment = serde_json::from_str("0").unwrap();
        assert_eq!(back, Sentiment::Positive);
        assert!(serde_json::from_str::<Sentiment>("7").is_err());
    }

    #[test]
    fn test_cursor_advances_forward() {
        let start = FetchCursor::start();
        assert_eq!(start.request_token(), "0");
        assert_eq!(start.page, 0);

        let next = start.advance("789".to_string());
        assert_eq!(next.request_token(), "789");
        assert_eq!(next.page, 1);
    }

    #[test]
    fn test_termination_artifact_kind() {
        assert_eq!(Termination::Completed.artifact_kind(), ArtifactKind::Full);
        assert_eq!(Termination::Stopped.artifact_kind(), ArtifactKind::Partial);
        assert_eq!(
            Termination::Failed("boom".into()).artifact_kind(),
            ArtifactKind::Partial
        );
    }
}
