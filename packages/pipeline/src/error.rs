use comment_harvester::{HarvesterError, PipelineKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Harvester(#[from] HarvesterError),

    #[error("LLM API request failed: {0}")]
    LlmApiRequest(#[from] reqwest::Error),

    #[error("LLM API error (status {status}): {message}")]
    LlmApiError { status: u16, message: String },

    #[error("LLM rate limited, retry after {retry_after_secs}s")]
    LlmRateLimited { retry_after_secs: u64 },

    #[error("failed to parse LLM response: {0}")]
    LlmResponseParse(String),

    #[error("LLM returned empty response")]
    LlmEmptyResponse,

    #[error("{0} pipeline is already running")]
    AlreadyRunning(PipelineKind),

    #[error("pipeline task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Incomplete credentials, for either the listing API or the LLM.
    pub fn is_missing_credentials(&self) -> bool {
        matches!(self, Self::Harvester(HarvesterError::MissingCredentials(_)))
    }

    /// Bad reference or credentials; rerunning unchanged will not help.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::Harvester(e) if e.is_input_error())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
