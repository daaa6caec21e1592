//! End-to-end sync against the local bucket store.
//!
//! Run with: `cargo test -p s3web-sync --test sync_workflow_test`

mod helpers;

use std::collections::BTreeSet;
use std::time::Duration;

use helpers::{TestSite, BUCKET};
use s3web_core::{md5_hex, S3webError};
use s3web_storage::ObjectStorage;
use s3web_sync::{CancellationToken, SyncOptions, SyncOrchestrator};

fn orchestrator(site: &TestSite) -> SyncOrchestrator {
    SyncOrchestrator::new(site.object_storage(), SyncOptions::default())
}

#[tokio::test]
async fn test_first_sync_uploads_everything() {
    let site = TestSite::new().await;
    site.write("index.html", "A");
    site.write("style.css", "B");

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html", "style.css"]);
    assert!(report.skipped.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(report.bytes_uploaded, 2);
    assert!(report.is_success());
    assert_eq!(site.remote_keys().await, vec!["index.html", "style.css"]);
}

#[tokio::test]
async fn test_second_sync_skips_unchanged_files() {
    let site = TestSite::new().await;
    site.write("index.html", "A");
    site.write("style.css", "B");
    let orchestrator = orchestrator(&site);

    orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();
    let calls_after_first = site.storage.put_calls();

    let report = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.uploaded.is_empty());
    assert_eq!(report.skipped, vec!["index.html", "style.css"]);
    assert_eq!(site.storage.put_calls(), calls_after_first);
}

#[tokio::test]
async fn test_only_modified_file_is_uploaded_again() {
    let site = TestSite::new().await;
    site.write("index.html", "A");
    site.write("style.css", "B");
    let orchestrator = orchestrator(&site);

    orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    site.write("index.html", "A2");
    let report = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert_eq!(report.skipped, vec!["style.css"]);
}

#[tokio::test]
async fn test_remote_etag_matches_local_hash_after_upload() {
    let site = TestSite::new().await;
    site.write("assets/app.js", "console.log(1)");

    orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    let listing = site.storage.list_objects(BUCKET).await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].key, "assets/app.js");
    assert_eq!(listing[0].etag, md5_hex(b"console.log(1)"));
}

#[tokio::test]
async fn test_empty_root_makes_no_calls() {
    let site = TestSite::new().await;

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.uploaded.is_empty());
    assert!(report.skipped.is_empty());
    assert!(report.is_success());
    assert_eq!(site.storage.put_calls(), 0);
}

#[tokio::test]
async fn test_remote_only_objects_are_left_alone() {
    let site = TestSite::new().await;
    site.storage
        .put_object(BUCKET, "old/page.html", "stale".into(), "text/html")
        .await
        .unwrap();
    site.write("index.html", "A");

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert!(!report.skipped.contains(&"old/page.html".to_string()));
    assert_eq!(site.remote_keys().await, vec!["index.html", "old/page.html"]);
}

#[tokio::test]
async fn test_failed_upload_does_not_stop_the_batch() {
    let site = TestSite::new().await;
    site.write("index.html", "A");
    site.write("style.css", "B");
    site.storage.fail_uploads_for("style.css");

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "style.css");
    assert!(matches!(report.failed[0].error, S3webError::Upload { .. }));
    assert!(!report.is_success());
    assert_eq!(site.remote_keys().await, vec!["index.html"]);
}

#[tokio::test]
async fn test_failed_file_is_retried_on_next_sync() {
    let site = TestSite::new().await;
    site.write("index.html", "A");
    site.storage.fail_uploads_for("index.html");
    let orchestrator = orchestrator(&site);

    let first = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.failed.len(), 1);

    // The file never reached the bucket, so it is still planned for upload.
    let second = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.failed.len(), 1);
    assert_eq!(site.storage.put_calls(), 2);
}

#[tokio::test]
async fn test_cancelled_sync_reports_undispatched_files() {
    let site = TestSite::new().await;
    for i in 0..4 {
        site.write(&format!("page{}.html", i), "x");
    }
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &cancel)
        .await
        .unwrap();

    assert_eq!(report.cancelled.len(), 4);
    assert!(report.uploaded.is_empty());
    assert_eq!(site.storage.put_calls(), 0);
    assert!(site.remote_keys().await.is_empty());
}

#[tokio::test]
async fn test_dry_run_leaves_bucket_untouched() {
    let site = TestSite::new().await;
    site.write("index.html", "A");

    let orchestrator = SyncOrchestrator::new(
        site.object_storage(),
        SyncOptions {
            dry_run: true,
            ..SyncOptions::default()
        },
    );
    let report = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert_eq!(site.storage.put_calls(), 0);
    assert!(site.remote_keys().await.is_empty());
}

#[tokio::test]
async fn test_missing_root_fails_before_any_call() {
    let site = TestSite::new().await;
    let missing = site.root().join("does-not-exist");

    let result = orchestrator(&site)
        .sync(&missing, BUCKET, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(S3webError::InvalidPath { .. })));
    assert_eq!(site.storage.put_calls(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_unreadable_name_is_failed_and_siblings_still_upload() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let site = TestSite::new().await;
    site.write("index.html", "A");
    std::fs::write(site.root().join(OsStr::from_bytes(b"bad\xff.html")), "B").unwrap();

    let report = orchestrator(&site)
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded, vec!["index.html"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "bad\u{FFFD}.html");
    assert!(matches!(report.failed[0].error, S3webError::Upload { .. }));
    assert!(!report.is_success());
    assert_eq!(site.remote_keys().await, vec!["index.html"]);
    assert_eq!(site.storage.put_calls(), 1);
}

#[tokio::test]
async fn test_uploads_never_exceed_concurrency() {
    let site = TestSite::new().await;
    for i in 0..12 {
        site.write(&format!("page{:02}.html", i), &i.to_string());
    }
    site.storage.delay_uploads(Duration::from_millis(20));

    let orchestrator = SyncOrchestrator::new(
        site.object_storage(),
        SyncOptions {
            concurrency: 3,
            dry_run: false,
        },
    );
    let report = orchestrator
        .sync(site.root(), BUCKET, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.uploaded.len(), 12);
    assert!(site.storage.peak_in_flight() <= 3);
    assert!(site.storage.peak_in_flight() > 1);
}

#[tokio::test]
async fn test_cancel_during_uploads_lets_in_flight_finish() {
    let site = TestSite::new().await;
    for i in 0..20 {
        site.write(&format!("page{:02}.html", i), "x");
    }
    site.storage.delay_uploads(Duration::from_millis(20));
    let cancel = CancellationToken::new();
    site.storage.cancel_on_call(3, cancel.clone());

    let orchestrator = SyncOrchestrator::new(
        site.object_storage(),
        SyncOptions {
            concurrency: 2,
            dry_run: false,
        },
    );
    let report = orchestrator.sync(site.root(), BUCKET, &cancel).await.unwrap();

    // Every dispatched upload, including the one that cancelled, completed.
    assert!(report.failed.is_empty());
    assert!(report.uploaded.len() >= 3);
    assert_eq!(report.uploaded.len(), site.storage.put_calls());
    assert!(site.storage.peak_in_flight() <= 2);
    assert!(!report.cancelled.is_empty());
    assert!(!report.is_success());

    let uploaded: BTreeSet<&String> = report.uploaded.iter().collect();
    let cancelled: BTreeSet<&String> = report.cancelled.iter().collect();
    assert!(uploaded.is_disjoint(&cancelled));
    assert_eq!(
        report.uploaded.len() + report.failed.len() + report.cancelled.len(),
        20
    );
    assert_eq!(site.remote_keys().await, report.uploaded);
}
