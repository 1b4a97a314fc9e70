//! Error types for the harvester.
//!
//! Input errors (`InvalidReference`, `OwnerUnresolved`, `MissingCredentials`)
//! are raised before any request is made. Transport and payload errors are
//! fatal to a fetch loop, which still flushes what it collected.

use thiserror::Error;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// Seed reference matches neither recognised form.
    #[error("Invalid thread reference: '{0}'. Expected '?id=<mid>&uid=<uid>' or '/<mid>?...'")]
    InvalidReference(String),

    /// Owner id could not be resolved for a reference without `uid=`.
    #[error("Could not resolve owner id for thread {thread_id}: {reason}")]
    OwnerUnresolved { thread_id: String, reason: String },

    /// A required credential field is empty.
    #[error("Missing credentials: '{0}' must not be empty")]
    MissingCredentials(&'static str),

    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Configured API base URL cannot be parsed.
    #[error("Invalid API URL '{url}': {source}")]
    InvalidApiUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV artifact could not be written or read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Checkpoint file could not be encoded or decoded.
    #[error("Checkpoint file is corrupt: {0}")]
    Checkpoint(#[from] serde_json::Error),
}

impl HarvesterError {
    /// Network or HTTP-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::HttpStatus { .. })
    }

    /// Bad user input; retrying will not help.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidReference(_) | Self::OwnerUnresolved { .. } | Self::MissingCredentials(_)
        )
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarvesterError::InvalidReference("not-a-url".to_string());
        assert!(err.to_string().contains("not-a-url"));
        assert!(err.to_string().contains("uid="));
    }

    #[test]
    fn test_missing_credentials_names_field() {
        let err = HarvesterError::MissingCredentials("cookie");
        assert_eq!(
            err.to_string(),
            "Missing credentials: 'cookie' must not be empty"
        );
    }

    #[test]
    fn test_error_classification() {
        let status = HarvesterError::HttpStatus {
            status: 502,
            url: "https://weibo.com/ajax".to_string(),
        };
        assert!(status.is_transport());
        assert!(!status.is_input_error());

        let malformed = HarvesterError::MalformedResponse("no data".to_string());
        assert!(!malformed.is_transport());

        assert!(HarvesterError::MissingCredentials("referer").is_input_error());
    }
}
