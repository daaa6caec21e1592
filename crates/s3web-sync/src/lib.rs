//! s3web Sync Library
//!
//! Deploys a local directory to a website bucket:
//!
//! - [`detector`] decides which local files differ from the remote listing.
//! - [`configurator`] creates the bucket and (re)applies policy and website settings.
//! - [`orchestrator`] lists, plans and uploads with bounded concurrency.
//!
//! Sync is a one-way mirror: remote objects without a local file are never deleted.

pub mod configurator;
pub mod detector;
pub mod orchestrator;

pub use configurator::BucketConfigurator;
pub use detector::{plan, plan_from_files, scan_local_tree, LocalScan};
pub use orchestrator::{SyncOptions, SyncOrchestrator};
pub use tokio_util::sync::CancellationToken;
