//! Paginated fetch loop that ties the harvester components together.
//!
//! Pages are fetched strictly one at a time. A page failure ends the run
//! (fail-fast, no retry), but whatever was collected is still saved and the
//! failed page's cursor is checkpointed so a resume re-requests exactly it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::checkpoint::{CheckpointStore, PipelineKind, Position, RunCheckpoint};
use crate::config::HarvesterConfig;
use crate::credentials::Credentials;
use crate::error::Result;
use crate::http::CommentSource;
use crate::reference::{resolve_reference, OwnerResolver, PathOwnerResolver};
use crate::sink::{load_comments, ResultSink};
use crate::state::{PipelineState, ProgressSink};
use crate::types::{CommentRecord, FetchCursor, FetchOutcome, Termination, ThreadRef};

/// Crawls a comment thread page by page into a CSV artifact.
pub struct Fetcher<S: CommentSource> {
    source: S,
    resolver: Arc<dyn OwnerResolver>,
    sink: ResultSink,
    checkpoints: CheckpointStore,
    page_delay: Duration,
}

/// Everything a single loop run starts from.
struct FetchRun {
    reference: String,
    thread: ThreadRef,
    cursor: FetchCursor,
    records: Vec<CommentRecord>,
    /// Checkpoint matching what is on disk when the run starts.
    origin: RunCheckpoint,
}

impl<S: CommentSource> Fetcher<S> {
    /// Fetcher writing to `config.output_dir`, resolving owners from the URL path.
    pub fn new(source: S, config: &HarvesterConfig) -> Self {
        Self {
            source,
            resolver: Arc::new(PathOwnerResolver),
            sink: ResultSink::new(&config.output_dir),
            checkpoints: CheckpointStore::in_dir(&config.output_dir),
            page_delay: config.page_delay,
        }
    }

    /// Replace the owner resolver used for references without `uid=`.
    pub fn with_resolver(mut self, resolver: Arc<dyn OwnerResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Write artifacts through `sink` instead of into the output directory.
    /// Checkpoints stay in the output directory.
    pub fn with_sink(mut self, sink: ResultSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    /// Crawl the thread identified by `reference` from its first page.
    ///
    /// Input errors are returned before any request is made. Once the loop
    /// has started, page failures are reported through
    /// [`Termination::Failed`] rather than as an `Err`.
    pub async fn fetch(
        &self,
        reference: &str,
        credentials: &Credentials,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome> {
        credentials.validate()?;
        let thread = resolve_reference(reference, self.resolver.as_ref()).await?;

        tracing::info!(
            thread_id = %thread.thread_id,
            owner_id = %thread.owner_id,
            "starting comment fetch"
        );

        let reference = reference.trim().to_string();
        let origin = RunCheckpoint::new(
            reference.as_str(),
            None,
            Position::Cursor {
                thread: thread.clone(),
                cursor: FetchCursor::start(),
            },
        );
        let run = FetchRun {
            reference,
            thread,
            cursor: FetchCursor::start(),
            records: Vec::new(),
            origin,
        };
        self.run(run, credentials, state, progress).await
    }

    /// Continue the last stopped or failed fetch from its checkpoint.
    ///
    /// Returns `Ok(None)` when there is nothing to resume.
    pub async fn resume(
        &self,
        credentials: &Credentials,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<Option<FetchOutcome>> {
        let Some(checkpoint) = self.checkpoints.load(PipelineKind::Fetch)? else {
            tracing::info!("no fetch checkpoint, nothing to resume");
            return Ok(None);
        };
        let Position::Cursor { thread, cursor } = checkpoint.position.clone() else {
            tracing::warn!("fetch checkpoint holds no cursor, ignoring it");
            return Ok(None);
        };
        credentials.validate()?;

        let records = match &checkpoint.partial_artifact {
            Some(path) => load_comments(path)?,
            None => Vec::new(),
        };

        tracing::info!(
            thread_id = %thread.thread_id,
            page = cursor.page + 1,
            already_fetched = records.len(),
            "resuming comment fetch"
        );

        let run = FetchRun {
            reference: checkpoint.source.clone(),
            thread,
            cursor,
            records,
            origin: checkpoint,
        };
        self.run(run, credentials, state, progress).await.map(Some)
    }

    async fn run(
        &self,
        run: FetchRun,
        credentials: &Credentials,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<FetchOutcome> {
        let FetchRun {
            reference,
            thread,
            mut cursor,
            mut records,
            origin,
        } = run;
        let mut pages = 0u32;

        let termination = loop {
            if !state.is_running() {
                break Termination::Stopped;
            }

            let page = match self.source.fetch_page(&thread, &cursor, credentials).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        transport = e.is_transport(),
                        page = cursor.page + 1,
                        fetched = records.len(),
                        "comment page request failed, aborting fetch"
                    );
                    break Termination::Failed(e.to_string());
                }
            };
            pages += 1;

            if page.comments.is_empty() {
                break Termination::Completed;
            }
            records.extend(page.comments);
            tracing::debug!(page = cursor.page + 1, total = records.len(), "fetched comment page");

            let signal = progress.report(records.len() as f64);

            let Some(token) = page.next_token else {
                break Termination::Completed;
            };
            cursor = cursor.advance(token);

            if signal.is_abort() {
                state.stop();
                break Termination::Stopped;
            }

            tokio::time::sleep(self.page_delay).await;
        };

        let artifact = match self.sink.save_comments(&records, termination.artifact_kind()) {
            Ok(artifact) => artifact,
            Err(e) => {
                // Nothing from this run reached disk; resume from where it began.
                tracing::error!(error = %e, "failed to save comments, keeping the run's starting checkpoint");
                if let Err(checkpoint_err) = self.checkpoints.save(PipelineKind::Fetch, &origin) {
                    tracing::warn!(error = %checkpoint_err, "failed to restore fetch checkpoint");
                }
                return Err(e);
            }
        };
        self.record_checkpoint(&termination, &reference, &thread, &cursor, artifact.clone())?;

        tracing::info!(
            records = records.len(),
            pages,
            termination = ?termination,
            "comment fetch finished"
        );

        Ok(FetchOutcome {
            artifact,
            records: records.len(),
            pages,
            termination,
        })
    }

    fn record_checkpoint(
        &self,
        termination: &Termination,
        reference: &str,
        thread: &ThreadRef,
        cursor: &FetchCursor,
        artifact: Option<PathBuf>,
    ) -> Result<()> {
        if termination.is_completed() {
            return self.checkpoints.clear(PipelineKind::Fetch);
        }
        let checkpoint = RunCheckpoint::new(
            reference,
            artifact,
            Position::Cursor {
                thread: thread.clone(),
                cursor: cursor.clone(),
            },
        );
        self.checkpoints.save(PipelineKind::Fetch, &checkpoint)
    }
}
