//! Amazon Rekognition video label detection

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{LabelDetectionSortBy, S3Object, Video, VideoJobStatus};
use aws_sdk_rekognition::Client as RekognitionClient;
use s3web_core::{LabelJobStatus, VideoLabel};

use crate::api::{LabelDetectionApi, LabelDetectionPage};
use crate::error::{LabelError, LabelResult};

/// Rekognition-backed [`LabelDetectionApi`]
#[derive(Clone)]
pub struct RekognitionLabels {
    client: RekognitionClient,
}

impl RekognitionLabels {
    /// Create a Rekognition client for the given region and profile
    pub async fn new(region: Option<String>, profile: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;

        Self::from_client(RekognitionClient::new(&config))
    }

    pub fn from_client(client: RekognitionClient) -> Self {
        Self { client }
    }
}

fn job_status(status: Option<&VideoJobStatus>, message: Option<&str>) -> LabelJobStatus {
    match status {
        Some(VideoJobStatus::Succeeded) => LabelJobStatus::Succeeded,
        Some(VideoJobStatus::Failed) => {
            LabelJobStatus::Failed(message.unwrap_or("Unknown error").to_string())
        }
        // IN_PROGRESS, or a status this SDK version does not know yet
        _ => LabelJobStatus::InProgress,
    }
}

#[async_trait]
impl LabelDetectionApi for RekognitionLabels {
    async fn start_label_detection(
        &self,
        bucket: &str,
        key: &str,
        min_confidence: Option<f32>,
    ) -> LabelResult<String> {
        let video = Video::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();

        let response = self
            .client
            .start_label_detection()
            .video(video)
            .set_min_confidence(min_confidence)
            .send()
            .await
            .map_err(|e| LabelError::StartFailed {
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        response
            .job_id()
            .map(String::from)
            .ok_or_else(|| LabelError::MissingJobId {
                key: key.to_string(),
            })
    }

    async fn get_label_detection(
        &self,
        job_id: &str,
        next_token: Option<String>,
    ) -> LabelResult<LabelDetectionPage> {
        let response = self
            .client
            .get_label_detection()
            .job_id(job_id)
            .sort_by(LabelDetectionSortBy::Timestamp)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| LabelError::PollFailed {
                job_id: job_id.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let labels = response
            .labels()
            .iter()
            .filter_map(|detection| {
                let label = detection.label()?;
                Some(VideoLabel {
                    timestamp_ms: detection.timestamp(),
                    name: label.name()?.to_string(),
                    confidence: label.confidence().unwrap_or(0.0),
                    parents: label
                        .parents()
                        .iter()
                        .filter_map(|p| p.name().map(String::from))
                        .collect(),
                })
            })
            .collect();

        Ok(LabelDetectionPage {
            status: job_status(response.job_status(), response.status_message()),
            labels,
            video_duration_ms: response.video_metadata().and_then(|m| m.duration_millis()),
            next_token: response.next_token().map(String::from),
        })
    }
}
