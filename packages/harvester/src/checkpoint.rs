//! Durable resume positions for the fetch and classify pipelines.
//!
//! Both checkpoints live in one JSON file in the output directory. Each
//! pipeline has a single slot that is overwritten on every stop and cleared
//! when a run completes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::Result;
use crate::types::{FetchCursor, ThreadRef};

/// Name of the checkpoint file inside the output directory.
pub const CHECKPOINT_FILE: &str = ".checkpoints.json";

// Serializes read-modify-write cycles of every store in the process, so
// concurrent fetch and classify saves cannot drop each other's slot.
static UPDATE_LOCK: Mutex<()> = Mutex::new(());

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Which pipeline a checkpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum PipelineKind {
    Fetch,
    Classify,
}

/// Where a stopped run resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Position {
    /// Next page of a comment listing.
    Cursor { thread: ThreadRef, cursor: FetchCursor },

    /// Record range of a classification input: the run covers
    /// `start_index..`, and everything before `next_index` is labeled.
    Index {
        #[serde(default)]
        start_index: usize,
        next_index: usize,
    },
}

/// Minimal state needed to resume a stopped run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCheckpoint {
    /// Seed reference (fetch) or source artifact path (classify).
    pub source: String,

    /// Artifact holding the results produced before the stop, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_artifact: Option<PathBuf>,

    pub position: Position,

    pub saved_at: DateTime<Utc>,
}

impl RunCheckpoint {
    pub fn new(source: impl Into<String>, partial_artifact: Option<PathBuf>, position: Position) -> Self {
        Self {
            source: source.into(),
            partial_artifact,
            position,
            saved_at: Utc::now(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fetch: Option<RunCheckpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    classify: Option<RunCheckpoint>,
}

impl CheckpointFile {
    fn slot(&mut self, kind: PipelineKind) -> &mut Option<RunCheckpoint> {
        match kind {
            PipelineKind::Fetch => &mut self.fetch,
            PipelineKind::Classify => &mut self.classify,
        }
    }
}

/// File-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store in `<output_dir>/.checkpoints.json`.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Checkpoint of a pipeline, or `None` if it has nothing to resume.
    pub fn load(&self, kind: PipelineKind) -> Result<Option<RunCheckpoint>> {
        Ok(self.read()?.slot(kind).take())
    }

    /// Replace the checkpoint of a pipeline.
    pub fn save(&self, kind: PipelineKind, checkpoint: &RunCheckpoint) -> Result<()> {
        let _guard = UPDATE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read()?;
        *file.slot(kind) = Some(checkpoint.clone());
        self.write(&file)?;
        tracing::debug!(pipeline = %kind, position = ?checkpoint.position, "saved checkpoint");
        Ok(())
    }

    /// Forget the checkpoint of a pipeline.
    pub fn clear(&self, kind: PipelineKind) -> Result<()> {
        let _guard = UPDATE_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read()?;
        if file.slot(kind).take().is_some() {
            self.write(&file)?;
            tracing::debug!(pipeline = %kind, "cleared checkpoint");
        }
        Ok(())
    }

    fn read(&self) -> Result<CheckpointFile> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CheckpointFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    // Write to a sibling temp file and rename, so readers never see a torn file.
    fn write(&self, file: &CheckpointFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_vec_pretty(file)?)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        Ok(())
    }

    // Unique per writer, also across processes sharing the directory.
    fn temp_path(&self) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}-{n}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }
}
