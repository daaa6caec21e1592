use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One label occurrence in a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLabel {
    /// Offset from the start of the video, in milliseconds.
    pub timestamp_ms: i64,
    pub name: String,
    pub confidence: f32,
    #[serde(default)]
    pub parents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum LabelJobStatus {
    InProgress,
    Succeeded,
    Failed(String),
}

impl LabelJobStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, LabelJobStatus::InProgress)
    }
}

/// Aggregate of all occurrences of one label name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSummary {
    pub name: String,
    pub occurrences: usize,
    pub max_confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelDetectionResult {
    pub job_id: String,
    pub video_duration_ms: Option<i64>,
    pub labels: Vec<VideoLabel>,
}

impl LabelDetectionResult {
    /// Per-name totals, highest confidence first, ties broken by name.
    pub fn summary(&self) -> Vec<LabelSummary> {
        let mut by_name: BTreeMap<&str, LabelSummary> = BTreeMap::new();
        for label in &self.labels {
            let entry = by_name
                .entry(label.name.as_str())
                .or_insert_with(|| LabelSummary {
                    name: label.name.clone(),
                    occurrences: 0,
                    max_confidence: 0.0,
                });
            entry.occurrences += 1;
            entry.max_confidence = entry.max_confidence.max(label.confidence);
        }

        let mut summary: Vec<LabelSummary> = by_name.into_values().collect();
        summary.sort_by(|a, b| {
            b.max_confidence
                .total_cmp(&a.max_confidence)
                .then_with(|| a.name.cmp(&b.name))
        });
        summary
    }
}
