//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use s3web_core::RemoteObject;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Bucket {0} already exists and is owned by someone else")]
    BucketConflict(String),

    #[error("Bucket not found: {0}")]
    NoSuchBucket(String),

    #[error("Bucket policy rejected: {0}")]
    PolicyRejected(String),

    #[error("Website configuration rejected: {0}")]
    WebsiteRejected(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// What `create_bucket` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketCreation {
    /// The bucket did not exist and was created.
    Created,
    /// The bucket already existed and belongs to the caller.
    AlreadyOwned,
}

/// Object storage abstraction trait
///
/// Every component receives an `Arc<dyn ObjectStorage>` explicitly; nothing
/// reaches for process-wide credentials. Implementations report provider
/// conditions through [`StorageError`] and never retry on their own.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Names of all buckets visible to the caller, sorted.
    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// Create a bucket.
    ///
    /// Returns `AlreadyOwned` rather than an error when the caller already owns
    /// it, and `StorageError::BucketConflict` when someone else does.
    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation>;

    /// Replace the bucket policy with `policy_json`.
    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()>;

    /// Enable static website hosting with the given index and error documents.
    async fn put_bucket_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> StorageResult<()>;

    /// List every object in the bucket, sorted by key.
    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<RemoteObject>>;

    /// Upload or overwrite an object and return its normalized ETag.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
