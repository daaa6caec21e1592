use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::S3webError;
use crate::hash::normalize_etag;

/// A regular file found under the sync root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalFile {
    /// Path relative to the sync root, always `/`-separated. Used as the object key.
    pub relative_path: String,
    /// Lowercase hex MD5 of the file contents.
    pub content_hash: String,
    pub size: u64,
    pub modified_time: DateTime<Utc>,
}

/// An object as reported by a bucket listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObject {
    pub key: String,
    pub etag: String,
    pub size: u64,
}

impl RemoteObject {
    /// Build a remote object, normalizing the provider's ETag.
    pub fn new(key: impl Into<String>, etag: &str, size: u64) -> Self {
        Self {
            key: key.into(),
            etag: normalize_etag(etag),
            size,
        }
    }
}

/// Classification of every local file for one sync call.
///
/// Every list is sorted by path. Remote objects without a local
/// counterpart never appear here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub uploads: Vec<LocalFile>,
    pub unchanged: Vec<LocalFile>,
    /// Files found under the root that could not be read or keyed.
    /// They are reported as failed and never uploaded.
    pub unreadable: Vec<FailedUpload>,
}

impl SyncPlan {
    pub fn upload_paths(&self) -> BTreeSet<String> {
        self.uploads.iter().map(|f| f.relative_path.clone()).collect()
    }

    pub fn unchanged_paths(&self) -> BTreeSet<String> {
        self.unchanged
            .iter()
            .map(|f| f.relative_path.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.uploads.len() + self.unchanged.len() + self.unreadable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.unchanged.is_empty() && self.unreadable.is_empty()
    }

    pub fn upload_bytes(&self) -> u64 {
        self.uploads.iter().map(|f| f.size).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub path: String,
    pub error: S3webError,
}

/// Outcome of a sync call.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub sync_id: Uuid,
    pub bucket: String,
    pub dry_run: bool,
    pub uploaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<FailedUpload>,
    /// Planned uploads that were never dispatched because the sync was cancelled.
    pub cancelled: Vec<String>,
    pub bytes_uploaded: u64,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn new(sync_id: Uuid, bucket: impl Into<String>, dry_run: bool) -> Self {
        Self {
            sync_id,
            bucket: bucket.into(),
            dry_run,
            uploaded: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            cancelled: Vec::new(),
            bytes_uploaded: 0,
            duration_ms: 0,
        }
    }

    /// True when every planned upload went through.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.cancelled.is_empty()
    }

    /// Sort every list so reports compare and print deterministically.
    pub fn sort(&mut self) {
        self.uploaded.sort();
        self.skipped.sort();
        self.cancelled.sort();
        self.failed.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, size: u64) -> LocalFile {
        LocalFile {
            relative_path: path.to_string(),
            content_hash: "00".to_string(),
            size,
            modified_time: Utc::now(),
        }
    }

    #[test]
    fn remote_object_normalizes_etag() {
        let obj = RemoteObject::new("index.html", "\"ABCDEF\"", 1);
        assert_eq!(obj.etag, "abcdef");
    }

    #[test]
    fn plan_paths_and_bytes() {
        let plan = SyncPlan {
            uploads: vec![file("a.html", 3), file("b/c.css", 4)],
            unchanged: vec![file("d.js", 10)],
            unreadable: vec![FailedUpload {
                path: "secret.html".to_string(),
                error: S3webError::upload("secret.html", "Permission denied"),
            }],
        };
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.upload_bytes(), 7);
        assert!(plan.upload_paths().contains("b/c.css"));
        assert!(plan.unchanged_paths().contains("d.js"));
        assert!(SyncPlan::default().is_empty());
    }

    #[test]
    fn report_success_requires_no_failures_or_cancellations() {
        let mut report = SyncReport::new(Uuid::new_v4(), "site", false);
        assert!(report.is_success());

        report.cancelled.push("late.html".to_string());
        assert!(!report.is_success());

        report.cancelled.clear();
        report.failed.push(FailedUpload {
            path: "x".to_string(),
            error: S3webError::upload("x", "boom"),
        });
        assert!(!report.is_success());
    }

    #[test]
    fn report_sort_orders_every_list() {
        let mut report = SyncReport::new(Uuid::new_v4(), "site", false);
        report.uploaded = vec!["b".into(), "a".into()];
        report.failed = vec![
            FailedUpload {
                path: "z".into(),
                error: S3webError::upload("z", "e"),
            },
            FailedUpload {
                path: "m".into(),
                error: S3webError::upload("m", "e"),
            },
        ];
        report.sort();
        assert_eq!(report.uploaded, vec!["a", "b"]);
        assert_eq!(report.failed[0].path, "m");
    }
}
