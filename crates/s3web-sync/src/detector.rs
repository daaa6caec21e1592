//! Change detection between a local tree and a bucket listing.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};
use s3web_core::{
    normalize_etag, FailedUpload, LocalFile, Md5Hasher, RemoteObject, S3webError, SyncPlan,
};
use s3web_storage::relative_key;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compute the sync plan for `local_root` against `remote_listing`.
///
/// Reads and hashes every file under the root; does not touch the remote.
/// Only an unusable root is an error. Files that cannot be read end up in
/// `SyncPlan::unreadable`.
/// Blocking: call it through `spawn_blocking` from async code.
pub fn plan(local_root: &Path, remote_listing: &[RemoteObject]) -> Result<SyncPlan, S3webError> {
    let scan = scan_local_tree(local_root)?;
    let mut plan = plan_from_files(scan.files, remote_listing);
    plan.unreadable = scan.unreadable;
    Ok(plan)
}

/// Classify already-scanned files.
///
/// A file is uploaded when no object has exactly its key or the ETag differs
/// from its content hash. Remote-only objects are ignored.
pub fn plan_from_files(files: Vec<LocalFile>, remote_listing: &[RemoteObject]) -> SyncPlan {
    let remote: HashMap<&str, &RemoteObject> = remote_listing
        .iter()
        .map(|obj| (obj.key.as_str(), obj))
        .collect();

    let mut plan = SyncPlan::default();
    for file in files {
        let unchanged = remote
            .get(file.relative_path.as_str())
            .is_some_and(|obj| normalize_etag(&obj.etag) == normalize_etag(&file.content_hash));

        if unchanged {
            plan.unchanged.push(file);
        } else {
            plan.uploads.push(file);
        }
    }

    plan.uploads.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    plan.unchanged.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    plan
}

/// Check that `local_root` is an existing, readable directory.
pub fn check_root(local_root: &Path) -> Result<(), S3webError> {
    let display = local_root.display().to_string();
    let metadata = std::fs::metadata(local_root)
        .map_err(|e| S3webError::invalid_path(&display, e.to_string()))?;
    if !metadata.is_dir() {
        return Err(S3webError::invalid_path(display, "not a directory"));
    }
    std::fs::read_dir(local_root).map_err(|e| S3webError::invalid_path(display, e.to_string()))?;
    Ok(())
}

/// Regular files found under a sync root.
#[derive(Debug, Default)]
pub struct LocalScan {
    /// Hashed files, sorted by relative path.
    pub files: Vec<LocalFile>,
    /// Entries that could not be read or keyed, sorted by path.
    pub unreadable: Vec<FailedUpload>,
}

/// Enumerate every regular file under `local_root`.
///
/// Symbolic links are not followed. A file that fails to read lands in
/// `unreadable` and the walk goes on with its siblings.
pub fn scan_local_tree(local_root: &Path) -> Result<LocalScan, S3webError> {
    check_root(local_root)?;

    let mut scan = LocalScan::default();
    for entry in walkdir::WalkDir::new(local_root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| display_relative(local_root, p))
                    .unwrap_or_else(|| local_root.display().to_string());
                scan.skip(path, e.to_string());
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let described = relative_key(local_root, path)
            .map_err(|e| e.to_string())
            .and_then(|key| describe_file(path, key).map_err(|e| e.to_string()));
        match described {
            Ok(file) => scan.files.push(file),
            Err(reason) => scan.skip(display_relative(local_root, path), reason),
        }
    }

    scan.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    scan.unreadable.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scan)
}

impl LocalScan {
    fn skip(&mut self, path: String, reason: String) {
        tracing::warn!(path = %path, error = %reason, "Skipping unreadable file");
        self.unreadable.push(FailedUpload {
            error: S3webError::upload(&path, reason),
            path,
        });
    }
}

/// Best-effort `/`-joined path for reporting, lossy for non-UTF-8 names.
fn display_relative(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn describe_file(path: &Path, relative_path: String) -> std::io::Result<LocalFile> {
    let mut file = File::open(path)?;
    let metadata = file.metadata()?;

    let mut hasher = Md5Hasher::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut size = 0u64;
    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
        size += read as u64;
    }

    let modified_time: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    Ok(LocalFile {
        relative_path,
        content_hash: hasher.finish(),
        size,
        modified_time,
    })
}
