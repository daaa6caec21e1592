//! Typed records exchanged between the storage, sync, and label crates.

pub mod bucket;
pub mod labels;
pub mod sync;

pub use bucket::{validate_bucket_name, BucketConfig, SiteSettings};
pub use labels::{LabelDetectionResult, LabelJobStatus, LabelSummary, VideoLabel};
pub use sync::{FailedUpload, LocalFile, RemoteObject, SyncPlan, SyncReport};
