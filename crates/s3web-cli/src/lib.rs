use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use s3web_core::{LabelSummary, LogFormat, RemoteObject, SyncReport};
use s3web_storage::{content_type_for_key, BucketCreation, ObjectStorage};

/// Exit code for a fatal error (bad path, bucket conflict, rejected configuration).
pub const EXIT_FATAL: u8 = 2;
/// Exit code when a sync finished with failed or cancelled uploads.
pub const EXIT_PARTIAL: u8 = 1;

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays parseable.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("s3web=info"));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", value, UNITS[unit])
    }
}

pub fn report_exit_code(report: &SyncReport) -> u8 {
    if report.is_success() {
        0
    } else {
        EXIT_PARTIAL
    }
}

/// Create `bucket` if needed, then upload `video` under its file name.
///
/// A bucket the caller already owns is reused. Returns the object key.
pub async fn upload_video(
    storage: &dyn ObjectStorage,
    video: &Path,
    bucket: &str,
) -> anyhow::Result<String> {
    let key = video
        .file_name()
        .and_then(|name| name.to_str())
        .map(String::from)
        .with_context(|| format!("Invalid video path: {}", video.display()))?;

    let data = tokio::fs::read(video)
        .await
        .with_context(|| format!("Failed to read {}", video.display()))?;

    let creation = storage
        .create_bucket(bucket)
        .await
        .with_context(|| format!("Failed to create bucket {}", bucket))?;
    if creation == BucketCreation::Created {
        tracing::info!(bucket = %bucket, "Bucket created for label detection");
    }

    let size_bytes = data.len();
    storage
        .put_object(bucket, &key, Bytes::from(data), content_type_for_key(&key))
        .await
        .with_context(|| format!("Failed to upload {} to {}", key, bucket))?;

    tracing::info!(bucket = %bucket, key = %key, size_bytes, "Video uploaded");
    Ok(key)
}

/// Per-file outcome lines followed by a summary.
pub fn render_report(report: &SyncReport) -> String {
    let mut out = String::new();
    let verb = if report.dry_run {
        "would upload"
    } else {
        "uploaded"
    };

    for path in &report.uploaded {
        let _ = writeln!(out, "{:<12} {}", verb, path);
    }
    for path in &report.skipped {
        let _ = writeln!(out, "{:<12} {}", "unchanged", path);
    }
    for failed in &report.failed {
        let _ = writeln!(out, "{:<12} {}: {}", "FAILED", failed.path, failed.error);
    }
    for path in &report.cancelled {
        let _ = writeln!(out, "{:<12} {}", "cancelled", path);
    }

    let _ = writeln!(
        out,
        "\n{} {}, {} unchanged, {} failed, {} cancelled ({} in {} ms)",
        report.uploaded.len(),
        verb,
        report.skipped.len(),
        report.failed.len(),
        report.cancelled.len(),
        format_size(report.bytes_uploaded),
        report.duration_ms
    );
    out
}

pub fn render_objects(objects: &[RemoteObject]) -> String {
    let mut out = String::new();
    if objects.is_empty() {
        out.push_str("No objects found.\n");
        return out;
    }

    let _ = writeln!(out, "{:<60} {:>12} {:<34}", "Key", "Size", "ETag");
    let _ = writeln!(out, "{}", "-".repeat(108));
    for object in objects {
        let _ = writeln!(
            out,
            "{:<60} {:>12} {:<34}",
            truncate_string(&object.key, 60),
            format_size(object.size),
            object.etag
        );
    }
    let _ = writeln!(out, "\nTotal: {} objects", objects.len());
    out
}

pub fn render_labels(summary: &[LabelSummary]) -> String {
    let mut out = String::new();
    if summary.is_empty() {
        out.push_str("No labels detected.\n");
        return out;
    }

    let _ = writeln!(out, "{:<40} {:>11} {:>15}", "Label", "Occurrences", "Max confidence");
    let _ = writeln!(out, "{}", "-".repeat(68));
    for label in summary {
        let _ = writeln!(
            out,
            "{:<40} {:>11} {:>14.1}%",
            truncate_string(&label.name, 40),
            label.occurrences,
            label.max_confidence
        );
    }
    out
}
