//! Sentiment distribution and the renderers that present it.

use std::path::{Path, PathBuf};

use comment_harvester::{LabeledComment, Sentiment};
use strum::IntoEnumIterator;

use crate::error::Result;

pub const STATS_REPORT_FILE: &str = "sentiment_stats.txt";

const RULE_WIDTH: usize = 20;

/// Human-facing label used in reports.
pub fn display_label(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::Positive => "积极",
        Sentiment::Neutral => "中性",
        Sentiment::Negative => "消极",
    }
}

/// Count and share of one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelShare {
    pub sentiment: Sentiment,
    pub count: usize,
    pub percentage: f64,
}

/// Label distribution of a labeled corpus, always in the order
/// positive, neutral, negative.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentSummary {
    pub total: usize,
    pub shares: Vec<LabelShare>,
}

impl SentimentSummary {
    pub fn from_rows(rows: &[LabeledComment]) -> Self {
        let total = rows.len();
        let shares = Sentiment::iter()
            .map(|sentiment| {
                let count = rows.iter().filter(|r| r.sentiment == sentiment).count();
                let percentage = if total == 0 {
                    0.0
                } else {
                    count as f64 / total as f64 * 100.0
                };
                LabelShare {
                    sentiment,
                    count,
                    percentage,
                }
            })
            .collect();
        Self { total, shares }
    }

    pub fn count(&self, sentiment: Sentiment) -> usize {
        self.shares
            .iter()
            .find(|s| s.sentiment == sentiment)
            .map_or(0, |s| s.count)
    }

    /// Plain-text report, one line per label.
    pub fn to_report(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut lines = vec![
            "情感分析统计报告".to_string(),
            rule.clone(),
            format!("总计: {} 条", self.total),
        ];
        lines.extend(self.shares.iter().map(|share| {
            format!(
                "{}: {} 条 ({:.1}%)",
                display_label(share.sentiment),
                share.count,
                share.percentage
            )
        }));
        lines.push(rule);

        let mut report = lines.join("\n");
        report.push('\n');
        report
    }
}

/// Turns labeled rows into an output file.
///
/// Chart collaborators (pie chart, word cloud) plug in here; the
/// workspace itself ships [`StatsReportRenderer`].
pub trait Renderer {
    fn render(&self, rows: &[LabeledComment], output_dir: &Path) -> Result<PathBuf>;
}

/// Writes the text distribution report to `sentiment_stats.txt`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsReportRenderer;

impl Renderer for StatsReportRenderer {
    fn render(&self, rows: &[LabeledComment], output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(STATS_REPORT_FILE);
        std::fs::write(&path, SentimentSummary::from_rows(rows).to_report())?;
        tracing::info!(path = %path.display(), rows = rows.len(), "wrote sentiment report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comment_harvester::CommentRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn rows(labels: &[Sentiment]) -> Vec<LabeledComment> {
        labels
            .iter()
            .enumerate()
            .map(|(i, s)| {
                LabeledComment::new(
                    CommentRecord {
                        comment_id: i.to_string(),
                        content: "text".into(),
                        created_at: String::new(),
                        user_name: "u".into(),
                        like_count: 0,
                    },
                    *s,
                )
            })
            .collect()
    }

    #[test]
    fn test_counts_in_fixed_order() {
        let summary = SentimentSummary::from_rows(&rows(&[
            Sentiment::Negative,
            Sentiment::Positive,
            Sentiment::Negative,
            Sentiment::Neutral,
        ]));
        assert_eq!(summary.total, 4);
        let order: Vec<_> = summary.shares.iter().map(|s| s.sentiment).collect();
        assert_eq!(
            order,
            vec![Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
        );
        assert_eq!(summary.count(Sentiment::Negative), 2);
        assert_eq!(summary.shares[2].percentage, 50.0);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let summary = SentimentSummary::from_rows(&rows(&[
            Sentiment::Positive,
            Sentiment::Neutral,
            Sentiment::Negative,
        ]));
        let sum: f64 = summary.shares.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_corpus_has_zero_shares() {
        let summary = SentimentSummary::from_rows(&[]);
        assert_eq!(summary.total, 0);
        assert!(summary.shares.iter().all(|s| s.count == 0 && s.percentage == 0.0));
    }

    #[test]
    fn test_report_lines() {
        let report =
            SentimentSummary::from_rows(&rows(&[Sentiment::Positive, Sentiment::Neutral]))
                .to_report();
        let rule = "=".repeat(20);
        let expected = format!(
            "情感分析统计报告\n{rule}\n总计: 2 条\n积极: 1 条 (50.0%)\n中性: 1 条 (50.0%)\n消极: 0 条 (0.0%)\n{rule}\n"
        );
        assert_eq!(report, expected);
    }

    #[test]
    fn test_stats_renderer_writes_report() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("charts");
        let path = StatsReportRenderer
            .render(&rows(&[Sentiment::Negative]), &out)
            .unwrap();
        assert_eq!(path, out.join(STATS_REPORT_FILE));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("消极: 1 条 (100.0%)"));
    }
}
