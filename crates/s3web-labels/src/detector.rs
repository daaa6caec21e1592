//! Start-then-poll driver for label detection jobs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use s3web_core::{Config, LabelDetectionResult, LabelJobStatus};
use tokio::time::sleep;

use crate::api::{LabelDetectionApi, LabelDetectionPage};
use crate::error::{LabelError, LabelResult};

const MAX_POLL_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Base delay; attempt `n` waits `n * interval`, capped at 10 seconds.
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 120,
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.label_poll_interval_secs),
            max_attempts: config.label_max_attempts.max(1),
        }
    }

    fn delay(&self, attempt: u32) -> Duration {
        self.interval.saturating_mul(attempt).min(MAX_POLL_DELAY)
    }
}

pub struct LabelDetector {
    api: Arc<dyn LabelDetectionApi>,
    settings: PollSettings,
}

impl LabelDetector {
    pub fn new(api: Arc<dyn LabelDetectionApi>, settings: PollSettings) -> Self {
        Self { api, settings }
    }

    /// Run label detection on `bucket/key` and return every label found.
    ///
    /// The video must already be in the bucket.
    pub async fn detect(
        &self,
        bucket: &str,
        key: &str,
        min_confidence: Option<f32>,
    ) -> LabelResult<LabelDetectionResult> {
        let start = Instant::now();
        let job_id = self
            .api
            .start_label_detection(bucket, key, min_confidence)
            .await?;

        tracing::info!(job_id = %job_id, bucket = %bucket, key = %key, "Label detection job started");

        let first = self.wait_for_completion(&job_id).await?;

        let mut result = LabelDetectionResult {
            job_id: job_id.clone(),
            video_duration_ms: first.video_duration_ms,
            labels: first.labels,
        };

        let mut next_token = first.next_token;
        while let Some(token) = next_token.take() {
            let page = self.api.get_label_detection(&job_id, Some(token)).await?;
            result.labels.extend(page.labels);
            if result.video_duration_ms.is_none() {
                result.video_duration_ms = page.video_duration_ms;
            }
            next_token = page.next_token;
        }

        tracing::info!(
            job_id = %job_id,
            labels = result.labels.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Label detection completed successfully"
        );

        Ok(result)
    }

    async fn wait_for_completion(&self, job_id: &str) -> LabelResult<LabelDetectionPage> {
        let mut attempts = 0;

        loop {
            let page = self.api.get_label_detection(job_id, None).await?;
            attempts += 1;

            match &page.status {
                LabelJobStatus::Succeeded => return Ok(page),
                LabelJobStatus::Failed(message) => {
                    tracing::error!(job_id = %job_id, error = %message, "Label detection job failed");
                    return Err(LabelError::JobFailed {
                        job_id: job_id.to_string(),
                        message: message.clone(),
                    });
                }
                LabelJobStatus::InProgress => {
                    if attempts >= self.settings.max_attempts {
                        tracing::warn!(job_id = %job_id, attempts, "Label detection timed out");
                        return Err(LabelError::TimedOut {
                            job_id: job_id.to_string(),
                            attempts,
                        });
                    }

                    let delay = self.settings.delay(attempts);
                    tracing::debug!(
                        job_id = %job_id,
                        attempt = attempts,
                        delay_secs = delay.as_secs(),
                        "Label detection in progress"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
