//! Shared key handling for storage backends.
//!
//! Keys are the `/`-joined components of a file's path relative to the sync
//! root, whatever the host separator. Comparison is exact and case-sensitive.

use std::path::{Component, Path};

use crate::traits::{StorageError, StorageResult};

/// Derive the object key for `path`, which must live under `root`.
pub fn relative_key(root: &Path, path: &Path) -> StorageResult<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        StorageError::InvalidKey(format!(
            "{} is not under {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    StorageError::InvalidKey(format!(
                        "{} is not valid UTF-8",
                        relative.display()
                    ))
                })?;
                parts.push(part);
            }
            Component::CurDir => {}
            _ => {
                return Err(StorageError::InvalidKey(format!(
                    "{} escapes the sync root",
                    relative.display()
                )))
            }
        }
    }

    let key = parts.join("/");
    validate_key(&key)?;
    Ok(key)
}

/// Reject keys that could escape a bucket directory or are empty.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Object key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains('\\') || key.split('/').any(|p| p == "..") {
        return Err(StorageError::InvalidKey(format!(
            "Object key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Content type served for a key, by extension.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = match key.rsplit_once('.') {
        Some((stem, ext)) if !stem.ends_with('/') && !ext.contains('/') => ext.to_lowercase(),
        _ => return "application/octet-stream",
    };

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "map" => "application/json",
        "xml" => "application/xml",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "avif" => "image/avif",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "wasm" => "application/wasm",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}
