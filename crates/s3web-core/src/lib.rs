//! s3web Core Library
//!
//! This crate provides the typed records, error taxonomy, and configuration
//! shared by the storage, sync, label-detection, and CLI crates.

pub mod config;
pub mod error;
pub mod hash;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, LogFormat};
pub use error::{LogLevel, S3webError};
pub use hash::{md5_hex, normalize_etag, Md5Hasher};
pub use models::{
    validate_bucket_name, BucketConfig, FailedUpload, LabelDetectionResult, LabelJobStatus,
    LabelSummary, LocalFile, RemoteObject, SiteSettings, SyncPlan, SyncReport, VideoLabel,
};
pub use storage_types::StorageBackend;
