//! Error types module
//!
//! All failures that cross a component boundary are unified under
//! [`S3webError`]. Batch operations (sync) record per-file `Upload` errors in
//! their report; single-item operations (setup-bucket) return the error directly.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like a bad local path
    Debug,
    /// Warning level - for recoverable issues like a single failed upload
    Warn,
    /// Error level - for failures that need human action
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum S3webError {
    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Failed to create bucket {bucket}: {reason}")]
    BucketCreation { bucket: String, reason: String },

    #[error("Failed to upload {path}: {reason}")]
    Upload { path: String, reason: String },

    #[error("Bucket {bucket} rejected configuration: {reason}")]
    Configuration { bucket: String, reason: String },

    #[error("Failed to list objects in {bucket}: {reason}")]
    RemoteListing { bucket: String, reason: String },
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn static_metadata(err: &S3webError) -> (&'static str, bool, LogLevel) {
    match err {
        S3webError::InvalidPath { .. } => ("INVALID_PATH", false, LogLevel::Debug),
        S3webError::BucketCreation { .. } => ("BUCKET_CREATION_ERROR", false, LogLevel::Error),
        S3webError::Upload { .. } => ("UPLOAD_ERROR", true, LogLevel::Warn),
        S3webError::Configuration { .. } => ("CONFIGURATION_ERROR", false, LogLevel::Error),
        S3webError::RemoteListing { .. } => ("REMOTE_LISTING_ERROR", true, LogLevel::Error),
    }
}

impl S3webError {
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        S3webError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn upload(path: impl Into<String>, reason: impl ToString) -> Self {
        S3webError::Upload {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Machine-readable error code (e.g., "UPLOAD_ERROR")
    pub fn error_code(&self) -> &'static str {
        static_metadata(self).0
    }

    /// Whether re-running the operation may succeed without human action
    pub fn is_recoverable(&self) -> bool {
        static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }
}

impl Serialize for S3webError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("S3webError", 2)?;
        state.serialize_field("code", self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
