//! Comment Harvester - Resumable crawl of social-media comment threads.
//!
//! This crate fetches the comments of a Weibo post page by page, saves them
//! as CSV artifacts, and checkpoints its position so a stopped crawl can be
//! resumed without refetching or skipping pages.
//!
//! # Example
//!
//! ```
//! use comment_harvester::reference::{parse_reference, ParsedReference};
//!
//! let parsed = parse_reference("https://weibo.com/ajax?id=4987&uid=1234").unwrap();
//! assert!(matches!(parsed, ParsedReference::Complete(_)));
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration constants and runtime settings
//! - [`types`]: Core data types (CommentRecord, Sentiment, FetchCursor, etc.)
//! - [`error`]: Error types and Result alias
//! - [`reference`]: Seed reference parsing and owner resolution
//! - [`credentials`]: Session headers for the listing API
//! - [`http`]: HTTP client for the comment-listing API
//! - [`state`]: Run flag and progress sink shared with a controller
//! - [`sink`]: CSV artifacts
//! - [`checkpoint`]: Durable resume positions
//! - [`fetcher`]: Paginated fetch loop

pub mod checkpoint;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod reference;
pub mod sink;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use checkpoint::{CheckpointStore, PipelineKind, Position, RunCheckpoint};
pub use config::HarvesterConfig;
pub use credentials::Credentials;
pub use error::{HarvesterError, Result};
pub use fetcher::Fetcher;
pub use http::{CommentSource, WeiboClient};
pub use reference::{OwnerResolver, PathOwnerResolver};
pub use sink::ResultSink;
pub use state::{NoProgress, PipelineState, ProgressSignal, ProgressSink};
pub use types::{
    ArtifactKind, CommentPage, CommentRecord, FetchCursor, FetchOutcome, LabeledComment,
    Sentiment, Termination, ThreadRef,
};
