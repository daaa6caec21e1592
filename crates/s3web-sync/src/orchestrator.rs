//! Sync orchestration: list, plan, then upload with bounded concurrency.
//!
//! Uploads run as tasks in a `JoinSet`, gated by a semaphore. The dispatch
//! loop is the only writer of the report; tasks hand their outcome back
//! through the join set. Cancellation stops new dispatches, lets in-flight
//! uploads finish, and lists the rest under `cancelled`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use s3web_core::{Config, FailedUpload, LocalFile, S3webError, SyncPlan, SyncReport};
use s3web_storage::{content_type_for_key, ObjectStorage};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::detector;

const DEFAULT_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of uploads in flight.
    pub concurrency: usize,
    /// Plan only; report what would be uploaded without writing.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.sync_concurrency,
            dry_run: false,
        }
    }
}

/// Result of one upload task.
struct UploadOutcome {
    path: String,
    size: u64,
    result: Result<String, S3webError>,
}

pub struct SyncOrchestrator {
    storage: Arc<dyn ObjectStorage>,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(storage: Arc<dyn ObjectStorage>, options: SyncOptions) -> Self {
        Self { storage, options }
    }

    /// Mirror `local_root` into `bucket`.
    ///
    /// Fails fast on an invalid root or a failed listing. Unreadable files and
    /// individual upload failures are recorded in the report and never abort
    /// the batch.
    pub async fn sync(
        &self,
        local_root: &Path,
        bucket: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, S3webError> {
        let sync_id = Uuid::new_v4();
        let start = Instant::now();
        let root = local_root.to_path_buf();

        detector::check_root(&root)?;

        let listing = self.storage.list_objects(bucket).await.map_err(|e| {
            tracing::error!(sync_id = %sync_id, bucket = %bucket, error = %e, "Remote listing failed");
            S3webError::RemoteListing {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            }
        })?;

        let plan = {
            let root = root.clone();
            tokio::task::spawn_blocking(move || detector::plan(&root, &listing))
                .await
                .map_err(|e| {
                    S3webError::invalid_path(
                        local_root.display().to_string(),
                        format!("scan task failed: {}", e),
                    )
                })??
        };

        tracing::info!(
            sync_id = %sync_id,
            bucket = %bucket,
            uploads = plan.uploads.len(),
            unchanged = plan.unchanged.len(),
            unreadable = plan.unreadable.len(),
            upload_bytes = plan.upload_bytes(),
            dry_run = self.options.dry_run,
            "Sync plan computed"
        );

        let mut report = SyncReport::new(sync_id, bucket, self.options.dry_run);
        report.skipped = plan
            .unchanged
            .iter()
            .map(|f| f.relative_path.clone())
            .collect();
        report.failed.extend(plan.unreadable.iter().cloned());

        if self.options.dry_run {
            report.uploaded = plan.uploads.into_iter().map(|f| f.relative_path).collect();
        } else {
            self.upload_all(&root, bucket, plan, cancel, &mut report).await;
        }

        report.sort();
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            sync_id = %sync_id,
            bucket = %bucket,
            uploaded = report.uploaded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            cancelled = report.cancelled.len(),
            bytes_uploaded = report.bytes_uploaded,
            duration_ms = report.duration_ms,
            "Sync finished"
        );

        Ok(report)
    }

    async fn upload_all(
        &self,
        root: &Path,
        bucket: &str,
        plan: SyncPlan,
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks: JoinSet<UploadOutcome> = JoinSet::new();
        let mut in_flight: HashSet<String> = HashSet::new();
        let mut pending = plan.uploads.into_iter();
        let mut next = pending.next();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled(), if next.is_some() => {
                    tracing::warn!(sync_id = %report.sync_id, "Sync cancelled, no further uploads will start");
                    report.cancelled.extend(
                        next.take()
                            .into_iter()
                            .chain(pending.by_ref())
                            .map(|f| f.relative_path),
                    );
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    match joined {
                        Ok(outcome) => {
                            in_flight.remove(&outcome.path);
                            record(report, outcome);
                        }
                        Err(e) => {
                            tracing::error!(sync_id = %report.sync_id, error = %e, "Upload task aborted");
                        }
                    }
                }

                permit = semaphore.clone().acquire_owned(), if next.is_some() => {
                    let (Ok(permit), Some(file)) = (permit, next.take()) else {
                        break;
                    };
                    in_flight.insert(file.relative_path.clone());
                    tasks.spawn(upload_one(
                        Arc::clone(&self.storage),
                        root.to_path_buf(),
                        bucket.to_string(),
                        file,
                        permit,
                    ));
                    next = pending.next();
                }

                else => break,
            }
        }

        // Tasks that ended without an outcome panicked; keep them in the report.
        for path in in_flight {
            report.failed.push(FailedUpload {
                error: S3webError::upload(&path, "upload task terminated unexpectedly"),
                path,
            });
        }
    }
}

fn record(report: &mut SyncReport, outcome: UploadOutcome) {
    match outcome.result {
        Ok(_) => {
            report.bytes_uploaded += outcome.size;
            report.uploaded.push(outcome.path);
        }
        Err(error) => {
            tracing::error!(
                sync_id = %report.sync_id,
                key = %outcome.path,
                error = %error,
                "Upload failed, continuing with remaining files"
            );
            report.failed.push(FailedUpload {
                path: outcome.path,
                error,
            });
        }
    }
}

async fn upload_one(
    storage: Arc<dyn ObjectStorage>,
    root: PathBuf,
    bucket: String,
    file: LocalFile,
    _permit: OwnedSemaphorePermit,
) -> UploadOutcome {
    let key = file.relative_path.clone();
    let result = async {
        let data = tokio::fs::read(root.join(&key))
            .await
            .map_err(|e| S3webError::upload(&key, e))?;

        let etag = storage
            .put_object(&bucket, &key, Bytes::from(data), content_type_for_key(&key))
            .await
            .map_err(|e| S3webError::upload(&key, e))?;

        if !etag.is_empty() && etag != file.content_hash {
            tracing::warn!(
                bucket = %bucket,
                key = %key,
                etag = %etag,
                content_hash = %file.content_hash,
                "Returned ETag differs from local content hash; the next sync will upload this file again"
            );
        }

        Ok::<_, S3webError>(etag)
    }
    .await;

    UploadOutcome {
        path: key,
        size: file.size,
        result,
    }
}
