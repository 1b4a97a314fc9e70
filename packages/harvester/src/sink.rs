//! CSV artifacts for fetched and labeled comments.
//!
//! Every save creates a new file named `<prefix>[_partial]_<unix-millis>.csv`;
//! existing files are never overwritten. Files are UTF-8 with a BOM so
//! spreadsheet tools detect the encoding of non-ASCII comment text.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{ArtifactKind, CommentRecord, LabeledComment, Sentiment};

/// Filename prefix for crawl output.
pub const COMMENTS_PREFIX: &str = "comments";

/// Filename prefix for classification output.
pub const ANALYZED_PREFIX: &str = "analyzed";

const PARTIAL_TAG: &str = "partial";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Attempts at finding a free filename within one millisecond.
const MAX_NAME_ATTEMPTS: u32 = 100;

/// Row layout of a classification artifact.
#[derive(Debug, Serialize, Deserialize)]
struct AnalyzedRow {
    comment_id: String,
    content: String,
    created_at: String,
    user_name: String,
    like_count: u64,
    sentiment: Sentiment,
}

impl From<&LabeledComment> for AnalyzedRow {
    fn from(labeled: &LabeledComment) -> Self {
        let r = &labeled.record;
        Self {
            comment_id: r.comment_id.clone(),
            content: r.content.clone(),
            created_at: r.created_at.clone(),
            user_name: r.user_name.clone(),
            like_count: r.like_count,
            sentiment: labeled.sentiment,
        }
    }
}

impl From<AnalyzedRow> for LabeledComment {
    fn from(row: AnalyzedRow) -> Self {
        LabeledComment::new(
            CommentRecord {
                comment_id: row.comment_id,
                content: row.content,
                created_at: row.created_at,
                user_name: row.user_name,
                like_count: row.like_count,
            },
            row.sentiment,
        )
    }
}

/// Writes run output to an output directory.
#[derive(Debug, Clone)]
pub struct ResultSink {
    output_dir: PathBuf,
}

impl ResultSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save fetched comments.
    ///
    /// Returns `Ok(None)` without touching the filesystem when `records` is empty.
    pub fn save_comments(
        &self,
        records: &[CommentRecord],
        kind: ArtifactKind,
    ) -> Result<Option<PathBuf>> {
        self.save_rows(COMMENTS_PREFIX, kind, records)
    }

    /// Save labeled comments.
    ///
    /// Returns `Ok(None)` without touching the filesystem when `rows` is empty.
    pub fn save_labeled(
        &self,
        rows: &[LabeledComment],
        kind: ArtifactKind,
    ) -> Result<Option<PathBuf>> {
        let rows: Vec<AnalyzedRow> = rows.iter().map(AnalyzedRow::from).collect();
        self.save_rows(ANALYZED_PREFIX, kind, &rows)
    }

    fn save_rows<T: Serialize>(
        &self,
        prefix: &str,
        kind: ArtifactKind,
        rows: &[T],
    ) -> Result<Option<PathBuf>> {
        if rows.is_empty() {
            tracing::debug!(prefix, "nothing to save, skipping artifact");
            return Ok(None);
        }

        let (path, mut file) = self.create_unique(prefix, kind)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::info!(
            path = %path.display(),
            rows = rows.len(),
            kind = %kind,
            "saved artifact"
        );
        Ok(Some(path))
    }

    fn create_unique(&self, prefix: &str, kind: ArtifactKind) -> Result<(PathBuf, File)> {
        fs::create_dir_all(&self.output_dir)?;
        let stamp = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let path = self
                .output_dir
                .join(artifact_file_name(prefix, kind, stamp, attempt));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!(
                "no free artifact name for {prefix} in {}",
                self.output_dir.display()
            ),
        )
        .into())
    }
}

/// Build an artifact filename.
///
/// # Examples
/// ```
/// use comment_harvester::sink::artifact_file_name;
/// use comment_harvester::types::ArtifactKind;
///
/// assert_eq!(artifact_file_name("analyzed", ArtifactKind::Full, 17, 0), "analyzed_17.csv");
/// assert_eq!(
///     artifact_file_name("analyzed", ArtifactKind::Partial, 17, 2),
///     "analyzed_partial_17-2.csv"
/// );
/// ```
pub fn artifact_file_name(prefix: &str, kind: ArtifactKind, stamp: i64, attempt: u32) -> String {
    let tag = match kind {
        ArtifactKind::Full => String::new(),
        ArtifactKind::Partial => format!("_{PARTIAL_TAG}"),
    };
    let suffix = if attempt == 0 {
        String::new()
    } else {
        format!("-{attempt}")
    };
    format!("{prefix}{tag}_{stamp}{suffix}.csv")
}

/// Recover the artifact kind from a filename written by [`ResultSink`].
pub fn artifact_kind(path: &Path) -> Option<ArtifactKind> {
    let name = path.file_name()?.to_str()?;
    [COMMENTS_PREFIX, ANALYZED_PREFIX]
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix)?.strip_prefix('_'))
        .map(|rest| {
            if rest.starts_with(&format!("{PARTIAL_TAG}_")) {
                ArtifactKind::Partial
            } else {
                ArtifactKind::Full
            }
        })
}

/// Read a crawl artifact.
pub fn load_comments(path: &Path) -> Result<Vec<CommentRecord>> {
    read_rows(path)
}

/// Read a classification artifact.
pub fn load_labeled(path: &Path) -> Result<Vec<LabeledComment>> {
    let rows: Vec<AnalyzedRow> = read_rows(path)?;
    Ok(rows.into_iter().map(LabeledComment::from).collect())
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = fs::read_to_string(path)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let rows = reader.deserialize().collect::<std::result::Result<Vec<T>, _>>()?;
    Ok(rows)
}
