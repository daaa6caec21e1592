use crate::keys::{relative_key, validate_key};
use crate::traits::{BucketCreation, ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use s3web_core::{md5_hex, RemoteObject};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Directory under the base path holding per-bucket metadata.
const META_DIR: &str = ".s3web";
const DEFAULT_OWNER: &str = "local";

/// Local filesystem storage implementation
///
/// Each bucket is a directory under `base_path`; its objects are files keyed
/// by their relative path. Bucket owner, policy and website settings are kept
/// in `{base_path}/.s3web/{bucket}/`.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    owner: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory holding one directory per bucket
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(base_path.join(META_DIR))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalStorage {
            base_path,
            owner: DEFAULT_OWNER.to_string(),
        })
    }

    /// Act as a different owner. Buckets created by another owner conflict.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Policy last applied to `bucket`, if any.
    pub async fn bucket_policy(&self, bucket: &str) -> StorageResult<Option<String>> {
        let path = self.meta_dir(bucket)?.join("policy.json");
        read_optional(&path).await
    }

    /// Website configuration last applied to `bucket`, as (index, error).
    pub async fn bucket_website(&self, bucket: &str) -> StorageResult<Option<(String, String)>> {
        let path = self.meta_dir(bucket)?.join("website.json");
        let Some(raw) = read_optional(&path).await? else {
            return Ok(None);
        };
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| StorageError::BackendError(format!("Corrupt website.json: {}", e)))?;
        let field = |name: &str| value[name].as_str().unwrap_or_default().to_string();
        Ok(Some((field("index_document"), field("error_document"))))
    }

    fn check_bucket_name(bucket: &str) -> StorageResult<()> {
        if bucket.is_empty()
            || bucket.starts_with('.')
            || bucket.contains('/')
            || bucket.contains('\\')
        {
            return Err(StorageError::InvalidKey(format!(
                "Invalid bucket name: {}",
                bucket
            )));
        }
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        Self::check_bucket_name(bucket)?;
        Ok(self.base_path.join(bucket))
    }

    fn meta_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        Self::check_bucket_name(bucket)?;
        Ok(self.base_path.join(META_DIR).join(bucket))
    }

    /// Directory of an existing bucket, or `NoSuchBucket`.
    async fn existing_bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        if !fs::try_exists(&dir).await.unwrap_or(false) {
            return Err(StorageError::NoSuchBucket(bucket.to_string()));
        }
        Ok(dir)
    }

    /// Convert an object key to a filesystem path with security validation
    ///
    /// The key is rejected if it contains traversal sequences that could
    /// escape the bucket directory.
    fn key_to_path(bucket_dir: &Path, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        let path = bucket_dir.join(key);
        if path.strip_prefix(bucket_dir).is_err() {
            return Err(StorageError::InvalidKey(
                "Object key resolves outside bucket directory".to_string(),
            ));
        }
        Ok(path)
    }
}

async fn read_optional(path: &Path) -> StorageResult<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::IoError(e)),
    }
}

/// Walk a bucket directory and describe every file in it.
fn scan_bucket(bucket_dir: &Path) -> StorageResult<Vec<RemoteObject>> {
    let mut objects = Vec::new();
    for entry in walkdir::WalkDir::new(bucket_dir).follow_links(false) {
        let entry = entry.map_err(|e| StorageError::ListFailed(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let key = relative_key(bucket_dir, entry.path())?;
        let data = std::fs::read(entry.path())?;
        objects.push(RemoteObject::new(key, &md5_hex(&data), data.len() as u64));
    }
    objects.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(objects)
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.base_path).await?;
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type().await?.is_dir() {
                continue;
            }
            buckets.push(name);
        }
        buckets.sort();
        Ok(buckets)
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation> {
        let dir = self.bucket_dir(bucket)?;
        let meta = self.meta_dir(bucket)?;
        let owner_path = meta.join("owner");

        if fs::try_exists(&dir).await.unwrap_or(false) {
            return match read_optional(&owner_path).await? {
                Some(owner) if owner.trim() != self.owner => {
                    tracing::warn!(
                        bucket = %bucket,
                        owner = %owner.trim(),
                        "Local bucket owned by another owner"
                    );
                    Err(StorageError::BucketConflict(bucket.to_string()))
                }
                _ => Ok(BucketCreation::AlreadyOwned),
            };
        }

        fs::create_dir_all(&dir).await?;
        fs::create_dir_all(&meta).await?;
        fs::write(&owner_path, &self.owner).await?;

        tracing::info!(
            path = %dir.display(),
            bucket = %bucket,
            "Local bucket created"
        );

        Ok(BucketCreation::Created)
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()> {
        self.existing_bucket_dir(bucket).await?;

        let parsed: serde_json::Value = serde_json::from_str(policy_json)
            .map_err(|e| StorageError::PolicyRejected(format!("Malformed policy: {}", e)))?;
        if !parsed.is_object() {
            return Err(StorageError::PolicyRejected(
                "Policy must be a JSON object".to_string(),
            ));
        }

        let meta = self.meta_dir(bucket)?;
        fs::create_dir_all(&meta).await?;
        fs::write(meta.join("policy.json"), policy_json).await?;
        Ok(())
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> StorageResult<()> {
        self.existing_bucket_dir(bucket).await?;

        if index_document.is_empty() || index_document.contains('/') {
            return Err(StorageError::WebsiteRejected(format!(
                "Invalid index document suffix: '{}'",
                index_document
            )));
        }
        if error_document.is_empty() {
            return Err(StorageError::WebsiteRejected(
                "Error document key must not be empty".to_string(),
            ));
        }

        let website = serde_json::json!({
            "index_document": index_document,
            "error_document": error_document,
        });
        let meta = self.meta_dir(bucket)?;
        fs::create_dir_all(&meta).await?;
        fs::write(meta.join("website.json"), website.to_string()).await?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<RemoteObject>> {
        let dir = self.existing_bucket_dir(bucket).await?;
        let start = std::time::Instant::now();

        let objects = tokio::task::spawn_blocking(move || scan_bucket(&dir))
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))??;

        tracing::debug!(
            bucket = %bucket,
            objects = objects.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage listing complete"
        );

        Ok(objects)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        let dir = self.existing_bucket_dir(bucket).await?;
        let path = Self::key_to_path(&dir, key)?;
        let size = data.len();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(md5_hex(&data))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
