//! Classification loop over a harvested comment artifact.
//!
//! Items are labeled one at a time. Per-item failures never abort the run:
//! the comment gets the neutral label and the loop moves on. A stop between
//! items saves a partial artifact and checkpoints the range it covers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use comment_harvester::sink::{load_comments, load_labeled};
use comment_harvester::{
    CheckpointStore, CommentRecord, HarvesterError, LabeledComment, PipelineKind, PipelineState,
    Position, ProgressSink, ResultSink, RunCheckpoint, Sentiment, Termination,
};

use crate::classifier::{build_sentiment_request, parse_sentiment, LlmClient};
use crate::config::ClassifierConfig;
use crate::error::Result;

/// Result of one classification run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOutcome {
    /// Artifact written by this run, `None` when there was nothing to save.
    pub artifact: Option<PathBuf>,
    /// Rows in the artifact.
    pub labeled: usize,
    /// Records in the source.
    pub total: usize,
    /// Items that got the neutral label because the call failed or the
    /// reply was not a label.
    pub fallbacks: usize,
    pub termination: Termination,
}

/// Labels comments through an [`LlmClient`].
pub struct ClassificationWorker {
    client: Arc<dyn LlmClient>,
    sink: ResultSink,
    checkpoints: CheckpointStore,
    has_api_key: bool,
    max_tokens: u32,
    temperature: f64,
    item_delay: Duration,
}

struct ClassifyRun {
    source: String,
    records: Vec<CommentRecord>,
    /// Labels for `records[start_index..next_index]`.
    labeled: Vec<LabeledComment>,
    start_index: usize,
    next_index: usize,
    /// Checkpoint matching what is on disk when the run starts.
    origin: RunCheckpoint,
}

impl ClassificationWorker {
    pub fn new(
        client: Arc<dyn LlmClient>,
        config: &ClassifierConfig,
        output_dir: impl AsRef<Path>,
    ) -> Self {
        let output_dir = output_dir.as_ref();
        Self {
            client,
            sink: ResultSink::new(output_dir),
            checkpoints: CheckpointStore::in_dir(output_dir),
            has_api_key: !config.api_key.trim().is_empty(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            item_delay: config.item_delay,
        }
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

    /// Label `records[start_index..]`.
    ///
    /// `source` is recorded in the checkpoint so [`resume`](Self::resume)
    /// can reload the records; it should be the path of the comments
    /// artifact they came from.
    pub async fn classify(
        &self,
        source: &str,
        records: Vec<CommentRecord>,
        start_index: usize,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<ClassifyOutcome> {
        self.ensure_api_key()?;
        let start_index = start_index.min(records.len());

        tracing::info!(
            source,
            total = records.len(),
            start_index,
            "starting classification"
        );

        let run = ClassifyRun {
            source: source.to_string(),
            records,
            labeled: Vec::new(),
            start_index,
            next_index: start_index,
            origin: RunCheckpoint::new(
                source,
                None,
                Position::Index {
                    start_index,
                    next_index: start_index,
                },
            ),
        };
        self.run(run, state, progress).await
    }

    /// Load a comments artifact and label all of it.
    pub async fn classify_artifact(
        &self,
        path: &Path,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<ClassifyOutcome> {
        self.ensure_api_key()?;
        let records = load_comments(path)?;
        self.classify(&path.display().to_string(), records, 0, state, progress)
            .await
    }

    /// Continue the last stopped classification from its checkpoint.
    ///
    /// Returns `Ok(None)` when there is nothing to resume.
    pub async fn resume(
        &self,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<Option<ClassifyOutcome>> {
        let Some(checkpoint) = self.checkpoints.load(PipelineKind::Classify)? else {
            tracing::info!("no classify checkpoint, nothing to resume");
            return Ok(None);
        };
        let Position::Index {
            start_index,
            next_index,
        } = checkpoint.position.clone()
        else {
            tracing::warn!("classify checkpoint holds no index, ignoring it");
            return Ok(None);
        };
        self.ensure_api_key()?;

        let records = load_comments(Path::new(&checkpoint.source))?;
        let mut labeled = match &checkpoint.partial_artifact {
            Some(path) => load_labeled(path)?,
            None => Vec::new(),
        };

        let start_index = start_index.min(records.len());
        let mut next_index = next_index.clamp(start_index, records.len());
        let mut origin = checkpoint.clone();
        if start_index + labeled.len() != next_index {
            tracing::warn!(
                start_index,
                next_index,
                labeled = labeled.len(),
                "partial artifact does not match the checkpoint, relabeling from the run start"
            );
            labeled.clear();
            next_index = start_index;
            origin.partial_artifact = None;
            origin.position = Position::Index {
                start_index,
                next_index,
            };
        }

        tracing::info!(
            source = %checkpoint.source,
            start_index,
            next_index,
            total = records.len(),
            "resuming classification"
        );

        let run = ClassifyRun {
            source: checkpoint.source,
            records,
            labeled,
            start_index,
            next_index,
            origin,
        };
        self.run(run, state, progress).await.map(Some)
    }

    fn ensure_api_key(&self) -> Result<()> {
        if self.has_api_key {
            Ok(())
        } else {
            Err(HarvesterError::MissingCredentials("api_key").into())
        }
    }

    async fn run(
        &self,
        run: ClassifyRun,
        state: &PipelineState,
        progress: &dyn ProgressSink,
    ) -> Result<ClassifyOutcome> {
        let ClassifyRun {
            source,
            records,
            mut labeled,
            start_index,
            mut next_index,
            origin,
        } = run;
        let total = records.len();
        let mut fallbacks = 0usize;

        let termination = loop {
            let Some(record) = records.get(next_index) else {
                break Termination::Completed;
            };
            if !state.is_running() {
                break Termination::Stopped;
            }

            let (sentiment, fell_back) = self.label(next_index, &record.content).await;
            if fell_back {
                fallbacks += 1;
            }
            labeled.push(LabeledComment::new(record.clone(), sentiment));
            next_index += 1;

            let percent = next_index as f64 / total as f64 * 100.0;
            if progress.report(percent).is_abort() {
                state.stop();
                break if next_index < total {
                    Termination::Stopped
                } else {
                    Termination::Completed
                };
            }

            if next_index < total {
                tokio::time::sleep(self.item_delay).await;
            }
        };

        let artifact = match self.sink.save_labeled(&labeled, termination.artifact_kind()) {
            Ok(artifact) => artifact,
            Err(e) => {
                // Nothing from this run reached disk; resume from where it began.
                tracing::error!(error = %e, "failed to save labels, keeping the run's starting checkpoint");
                if let Err(checkpoint_err) = self.checkpoints.save(PipelineKind::Classify, &origin) {
                    tracing::warn!(error = %checkpoint_err, "failed to restore classify checkpoint");
                }
                return Err(e.into());
            }
        };
        if termination.is_completed() {
            self.checkpoints.clear(PipelineKind::Classify)?;
        } else {
            let position = Position::Index {
                start_index,
                next_index,
            };
            let checkpoint = RunCheckpoint::new(source, artifact.clone(), position);
            self.checkpoints.save(PipelineKind::Classify, &checkpoint)?;
        }

        tracing::info!(
            labeled = labeled.len(),
            total,
            fallbacks,
            termination = ?termination,
            "classification finished"
        );

        Ok(ClassifyOutcome {
            artifact,
            labeled: labeled.len(),
            total,
            fallbacks,
            termination,
        })
    }

    /// Label one comment; the flag is set when the fallback was used.
    async fn label(&self, index: usize, text: &str) -> (Sentiment, bool) {
        let request = build_sentiment_request(text, self.max_tokens, self.temperature);
        match self.client.complete(&request).await {
            Ok(response) => match parse_sentiment(&response.content) {
                Some(sentiment) => {
                    tracing::debug!(index, sentiment = %sentiment, "classified comment");
                    (sentiment, false)
                }
                None => {
                    tracing::warn!(
                        index,
                        reply = %response.content,
                        "unrecognized classifier reply, using neutral"
                    );
                    (Sentiment::FALLBACK, true)
                }
            },
            Err(e) => {
                tracing::warn!(index, error = %e, "classifier call failed, using neutral");
                (Sentiment::FALLBACK, true)
            }
        }
    }
}
