//! Sentiment Pipeline - LLM sentiment labeling on top of the comment harvester.
//!
//! - [`classifier`]: chat-completions client, prompt and reply parsing
//! - [`worker`]: resumable classification loop
//! - [`controller`]: start/stop/resume for both pipelines on tokio tasks
//! - [`summary`]: label distribution and report renderers
//! - [`cli`]: the `sentiment-pipeline` command line

pub mod classifier;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod summary;
pub mod worker;

pub use config::ClassifierConfig;
pub use controller::PipelineController;
pub use error::{PipelineError, Result};
pub use summary::{Renderer, SentimentSummary, StatsReportRenderer};
pub use worker::{ClassificationWorker, ClassifyOutcome};
