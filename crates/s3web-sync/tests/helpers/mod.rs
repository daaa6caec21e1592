//! Test helpers: a local bucket store plus a wrapper that fails chosen uploads,
//! slows uploads down and tracks how many run at once.
//!
//! Run from workspace root: `cargo test -p s3web-sync --test sync_workflow_test`.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use s3web_core::{RemoteObject, StorageBackend};
use s3web_storage::{BucketCreation, LocalStorage, ObjectStorage, StorageError, StorageResult};
use s3web_sync::CancellationToken;
use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BUCKET: &str = "site";

/// A local site directory and a local bucket store, both temporary.
pub struct TestSite {
    pub site_dir: TempDir,
    pub bucket_dir: TempDir,
    pub storage: Arc<FlakyStorage>,
}

impl TestSite {
    pub async fn new() -> Self {
        let site_dir = tempfile::tempdir().expect("Failed to create site directory");
        let bucket_dir = tempfile::tempdir().expect("Failed to create bucket directory");
        let inner = LocalStorage::new(bucket_dir.path())
            .await
            .expect("Failed to create local storage");
        inner
            .create_bucket(BUCKET)
            .await
            .expect("Failed to create test bucket");

        Self {
            site_dir,
            bucket_dir,
            storage: Arc::new(FlakyStorage::new(inner)),
        }
    }

    pub fn root(&self) -> &Path {
        self.site_dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) {
        let path = self.site_dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(path, content).expect("Failed to write site file");
    }

    /// Storage handle as the orchestrator sees it.
    pub fn object_storage(&self) -> Arc<dyn ObjectStorage> {
        self.storage.clone()
    }

    /// Keys currently stored in the test bucket, sorted.
    pub async fn remote_keys(&self) -> Vec<String> {
        self.storage
            .list_objects(BUCKET)
            .await
            .expect("Failed to list test bucket")
            .into_iter()
            .map(|o| o.key)
            .collect()
    }
}

/// Wraps [`LocalStorage`], failing `put_object` for configured keys and
/// counting every upload attempt.
pub struct FlakyStorage {
    inner: LocalStorage,
    failing_keys: Mutex<HashSet<String>>,
    put_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    put_delay: Mutex<Duration>,
    cancel_on_call: Mutex<Option<(usize, CancellationToken)>>,
}

impl FlakyStorage {
    pub fn new(inner: LocalStorage) -> Self {
        Self {
            inner,
            failing_keys: Mutex::new(HashSet::new()),
            put_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            put_delay: Mutex::new(Duration::ZERO),
            cancel_on_call: Mutex::new(None),
        }
    }

    pub fn fail_uploads_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    /// Hold every `put_object` for `delay` so uploads overlap.
    pub fn delay_uploads(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = delay;
    }

    /// Cancel `token` from inside the `call`-th `put_object` (1-based).
    pub fn cancel_on_call(&self, call: usize, token: CancellationToken) {
        *self.cancel_on_call.lock().unwrap() = Some((call, token));
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Highest number of `put_object` calls that were running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn put_tracked(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let call = self.put_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = self.cancel_on_call.lock().unwrap().as_ref() {
            if *at == call {
                token.cancel();
            }
        }

        let delay = *self.put_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.failing_keys.lock().unwrap().contains(key) {
            return Err(StorageError::UploadFailed(format!("injected failure for {}", key)));
        }
        self.inner.put_object(bucket, key, data, content_type).await
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        self.inner.list_buckets().await
    }

    async fn create_bucket(&self, bucket: &str) -> StorageResult<BucketCreation> {
        self.inner.create_bucket(bucket).await
    }

    async fn put_bucket_policy(&self, bucket: &str, policy_json: &str) -> StorageResult<()> {
        self.inner.put_bucket_policy(bucket, policy_json).await
    }

    async fn put_bucket_website(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> StorageResult<()> {
        self.inner
            .put_bucket_website(bucket, index_document, error_document)
            .await
    }

    async fn list_objects(&self, bucket: &str) -> StorageResult<Vec<RemoteObject>> {
        self.inner.list_objects(bucket).await
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let result = self.put_tracked(bucket, key, data, content_type).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
