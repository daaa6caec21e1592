use crate::traits::{BucketCreation, ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, ErrorDocument, IndexDocument,
    WebsiteConfiguration,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use s3web_core::{normalize_etag, RemoteObject};

/// Region where buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    region: String,
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// # Arguments
    /// * `region` - AWS region; falls back to the SDK's default provider chain
    /// * `profile` - Optional shared-config profile name
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        region: Option<String>,
        profile: Option<String>,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region.clone() {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let sdk_config = loader.load().await;

        let region = region
            .or_else(|| sdk_config.region().map(|r| r.to_string()))
            .ok_or_else(|| {
                StorageError::ConfigError(
                    "No region configured (set S3WEB_REGION or AWS_REGION)".to_string(),
                )
            })?;

        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        if let Some(endpoint) = endpoint_url {
            // S3-compatible providers generally only support path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::from_client(Client::from_conf(builder.build()), region))
    }

    /// Wrap an already configured client.
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        S3Storage {
            client,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Location constraint required by `CreateBucket` outside the default region.
    fn location_constraint(region: &str) -> Option<CreateBucketConfiguration> {
        if region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        )
    }

    /// Remove the public access block so a public-read policy is accepted.
    async fn allow_public_policy(&self, bucket: &str) -> StorageResult<()> {
        match self
            .client
            .delete_public_access_block()
            .bucket(bucket)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = DisplayErrorContext(&e).to_string();
                if message.contains("NoSuchPublicAccessBlockConfiguration") {
                    Ok(())
                } else {
                    Err(StorageError::PolicyRejected(message))
                }
            }
        }
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let output = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| StorageError::BackendError(DisplayErrorContext(&e).to_string()))?;

        let mut buckets: Vec<String> = output
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(String::from))
            .collect();
        buckets.sort();
        Ok(buckets)
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation> {
        let start = std::time::Instant::now();
        let result = self
            .client
            .create_bucket()
            .bucket(bucket)
            .set_create_bucket_configuration(Self::location_constraint(&self.region))
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(
                    bucket = %bucket,
                    region = %self.region,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 bucket created"
                );
                Ok(BucketCreation::Created)
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_bucket_already_owned_by_you() {
                    tracing::debug!(bucket = %bucket, "S3 bucket already owned");
                    Ok(BucketCreation::AlreadyOwned)
                } else if service_error.is_bucket_already_exists() {
                    Err(StorageError::BucketConflict(bucket.to_string()))
                } else {
                    tracing::error!(
                        error = %DisplayErrorContext(&service_error),
                        bucket = %bucket,
                        "S3 create bucket failed"
                    );
                    Err(StorageError::BackendError(
                        DisplayErrorContext(&service_error).to_string(),
                    ))
                }
            }
        }
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()> {
        self.allow_public_policy(bucket).await?;

        self.client
            .put_bucket_policy()
            .bucket(bucket)
            .policy(policy_json)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::error!(error = %message, bucket = %bucket, "S3 put bucket policy failed");
                StorageError::PolicyRejected(message)
            })?;

        tracing::info!(bucket = %bucket, "S3 bucket policy applied");
        Ok(())
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> StorageResult<()> {
        let index = IndexDocument::builder()
            .suffix(index_document)
            .build()
            .map_err(|e| StorageError::WebsiteRejected(e.to_string()))?;
        let error = ErrorDocument::builder()
            .key(error_document)
            .build()
            .map_err(|e| StorageError::WebsiteRejected(e.to_string()))?;
        let website = WebsiteConfiguration::builder()
            .index_document(index)
            .error_document(error)
            .build();

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(website)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::error!(error = %message, bucket = %bucket, "S3 put bucket website failed");
                StorageError::WebsiteRejected(message)
            })?;

        tracing::info!(
            bucket = %bucket,
            index_document = %index_document,
            error_document = %error_document,
            "S3 website configuration applied"
        );
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<RemoteObject>> {
        let start = std::time::Instant::now();
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    let service_error = e.into_service_error();
                    if service_error.is_no_such_bucket() {
                        StorageError::NoSuchBucket(bucket.to_string())
                    } else {
                        StorageError::ListFailed(DisplayErrorContext(&service_error).to_string())
                    }
                })?;

            for object in output.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                objects.push(RemoteObject::new(
                    key,
                    object.e_tag().unwrap_or_default(),
                    object.size().unwrap_or(0).max(0) as u64,
                ));
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));

        tracing::debug!(
            bucket = %bucket,
            objects = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 listing complete"
        );

        Ok(objects)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let output = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                tracing::error!(
                    error = %message,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(message)
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(output.e_tag().map(normalize_etag).unwrap_or_default())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
