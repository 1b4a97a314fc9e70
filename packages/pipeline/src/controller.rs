//! Starts, stops and resumes the fetch and classify pipelines.
//!
//! Each run gets its own task and its own [`PipelineState`]. The controller
//! keeps the state of the latest run per pipeline so `stop_*` can reach it;
//! a finished run flips its state back to stopped.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use comment_harvester::{
    CommentSource, Credentials, FetchOutcome, Fetcher, PipelineKind, PipelineState, ProgressSink,
};
use tokio::task::JoinHandle;

use crate::error::{PipelineError, Result};
use crate::worker::{ClassificationWorker, ClassifyOutcome};

pub struct PipelineController<S: CommentSource + 'static> {
    fetcher: Arc<Fetcher<S>>,
    worker: Arc<ClassificationWorker>,
    fetch_state: Mutex<PipelineState>,
    classify_state: Mutex<PipelineState>,
}

impl<S: CommentSource + 'static> PipelineController<S> {
    pub fn new(fetcher: Fetcher<S>, worker: ClassificationWorker) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            worker: Arc::new(worker),
            fetch_state: Mutex::new(PipelineState::new()),
            classify_state: Mutex::new(PipelineState::new()),
        }
    }

    /// Crawl `reference` on a new task.
    pub fn start_fetch(
        &self,
        reference: impl Into<String>,
        credentials: Credentials,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<Result<FetchOutcome>>> {
        let state = self.arm(PipelineKind::Fetch)?;
        let fetcher = Arc::clone(&self.fetcher);
        let reference = reference.into();

        Ok(tokio::spawn(async move {
            let result = fetcher
                .fetch(&reference, &credentials, &state, progress.as_ref())
                .await;
            state.stop();
            result.map_err(PipelineError::from)
        }))
    }

    /// Continue the checkpointed crawl on a new task.
    pub fn resume_fetch(
        &self,
        credentials: Credentials,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<Result<Option<FetchOutcome>>>> {
        let state = self.arm(PipelineKind::Fetch)?;
        let fetcher = Arc::clone(&self.fetcher);

        Ok(tokio::spawn(async move {
            let result = fetcher
                .resume(&credentials, &state, progress.as_ref())
                .await;
            state.stop();
            result.map_err(PipelineError::from)
        }))
    }

    /// Label the comments artifact at `path` on a new task.
    pub fn start_classify(
        &self,
        path: impl Into<PathBuf>,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<Result<ClassifyOutcome>>> {
        let state = self.arm(PipelineKind::Classify)?;
        let worker = Arc::clone(&self.worker);
        let path = path.into();

        Ok(tokio::spawn(async move {
            let result = worker
                .classify_artifact(&path, &state, progress.as_ref())
                .await;
            state.stop();
            result
        }))
    }

    /// Continue the checkpointed classification on a new task.
    pub fn resume_classify(
        &self,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<JoinHandle<Result<Option<ClassifyOutcome>>>> {
        let state = self.arm(PipelineKind::Classify)?;
        let worker = Arc::clone(&self.worker);

        Ok(tokio::spawn(async move {
            let result = worker.resume(&state, progress.as_ref()).await;
            state.stop();
            result
        }))
    }

    /// Ask the running crawl to stop at its next page boundary.
    pub fn stop_fetch(&self) {
        tracing::info!("stop requested for fetch pipeline");
        self.current(PipelineKind::Fetch).stop();
    }

    /// Ask the running classification to stop before its next item.
    pub fn stop_classify(&self) {
        tracing::info!("stop requested for classify pipeline");
        self.current(PipelineKind::Classify).stop();
    }

    pub fn is_fetch_running(&self) -> bool {
        self.current(PipelineKind::Fetch).is_running()
    }

    pub fn is_classify_running(&self) -> bool {
        self.current(PipelineKind::Classify).is_running()
    }

    fn slot(&self, kind: PipelineKind) -> &Mutex<PipelineState> {
        match kind {
            PipelineKind::Fetch => &self.fetch_state,
            PipelineKind::Classify => &self.classify_state,
        }
    }

    fn current(&self, kind: PipelineKind) -> PipelineState {
        self.slot(kind)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a fresh running state for a new run of `kind`.
    fn arm(&self, kind: PipelineKind) -> Result<PipelineState> {
        let mut slot = self
            .slot(kind)
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_running() {
            return Err(PipelineError::AlreadyRunning(kind));
        }
        let state = PipelineState::running();
        *slot = state.clone();
        Ok(state)
    }
}
