//! s3web Storage Library
//!
//! This crate provides the object storage abstraction used by the sync and
//! label-detection workflows, with implementations for S3 and the local
//! filesystem.
//!
//! # Object keys
//!
//! Keys are `/`-separated paths relative to the bucket root. They must not be
//! empty, start with `/`, or contain `..` components. Key derivation from local
//! paths lives in the `keys` module so every backend sees the same keys.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{content_type_for_key, relative_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use s3web_core::StorageBackend;
pub use traits::{BucketCreation, ObjectStorage, StorageError, StorageResult};
