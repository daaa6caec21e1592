//! Label detection provider abstraction.

use async_trait::async_trait;
use s3web_core::{LabelJobStatus, VideoLabel};

use crate::error::LabelResult;

/// One response from polling a label detection job.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelDetectionPage {
    pub status: LabelJobStatus,
    pub labels: Vec<VideoLabel>,
    pub video_duration_ms: Option<i64>,
    /// Set when more labels are available for a finished job.
    pub next_token: Option<String>,
}

/// Asynchronous video analysis over an object already stored in a bucket.
#[async_trait]
pub trait LabelDetectionApi: Send + Sync {
    /// Start a job for `bucket/key` and return its id.
    async fn start_label_detection(
        &self,
        bucket: &str,
        key: &str,
        min_confidence: Option<f32>,
    ) -> LabelResult<String>;

    /// Fetch the status of a job and, once it has succeeded, one page of labels.
    async fn get_label_detection(
        &self,
        job_id: &str,
        next_token: Option<String>,
    ) -> LabelResult<LabelDetectionPage>;
}
